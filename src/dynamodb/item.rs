use anyhow::Result;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

use crate::dynamodb::table::{PARTITION_KEY, SORT_KEY};

/// Raw DynamoDB item: a map of attribute names to typed attribute values.
///
/// This is the wire shape exchanged with the SDK. [`Record`] is built from
/// and rendered into it.
///
/// [`Record`]: crate::dynamodb::Record
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Item {
    pub(crate) attributes: HashMap<String, AttributeValue>,
}

impl Item {
    /// Creates a new empty `Item`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the primary key of a record.
    pub fn key(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self::new()
            .set_string(PARTITION_KEY, partition_key)
            .set_string(SORT_KEY, sort_key)
    }

    /// Sets a string attribute.
    pub fn set_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::S(value.into()));
        self
    }

    /// Sets an attribute from any serializable value.
    ///
    /// Maps and sequences become nested `M`/`L` attributes rather than
    /// strings, so the payload stays queryable by filter expressions.
    pub fn set_value<T: Serialize + ?Sized>(
        mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self> {
        self.attributes.insert(key.into(), to_attribute(value)?);
        Ok(self)
    }

    /// Gets the value of an attribute as a string.
    ///
    /// Returns `None` if the attribute doesn't exist or is not a string.
    pub fn get_string(&self, key: &str) -> Option<&String> {
        self.attributes.get(key).and_then(|av| av.as_s().ok())
    }

    /// Deserializes an attribute, `Ok(None)` if it is absent.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.attributes
            .get(key)
            .map(|av| from_attribute(av.clone()))
            .transpose()
    }

    pub fn into_attributes(self) -> HashMap<String, AttributeValue> {
        self.attributes
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self { attributes }
    }
}

pub(crate) fn to_attribute<T: Serialize + ?Sized>(value: &T) -> Result<AttributeValue> {
    Ok(serde_dynamo::aws_sdk_dynamodb_1::to_attribute_value(value)?)
}

pub(crate) fn from_attribute<T: DeserializeOwned>(value: AttributeValue) -> Result<T> {
    Ok(serde_dynamo::aws_sdk_dynamodb_1::from_attribute_value(value)?)
}
