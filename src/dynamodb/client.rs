use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::create_table::CreateTableOutput,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, GlobalSecondaryIndex, KeySchemaElement,
        KeyType, Projection, ProjectionType, ReturnValue, ScalarAttributeType,
    },
    Client,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::dynamodb::item::to_attribute;
use crate::dynamodb::table::{QueryTarget, ATTRIBUTES, PARTITION_KEY, SORT_KEY};
use crate::dynamodb::{Item, Record, RecordBackend, RecordQuery, RecordUpdate};

/// DynamoDB client wrapper bound to the record table.
///
/// # Table layout
///
/// - Primary key: `PK` (partition) + `SK` (sort), both strings.
/// - `attributes`: the business payload, stored as one nested map.
/// - Global secondary indexes `GSI1` (`GSI1PK` + `GSI1SK`), `GSI2PK` and
///   `GSI3PK`, all projecting every attribute.
///
/// # Error Handling
///
/// Methods return `anyhow::Result`. SDK errors are passed through with `?`
/// and not logged here; [`RecordStore`] logs them once.
///
/// [`RecordStore`]: crate::dynamodb::RecordStore
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
    table_name: String,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self::from_client(Client::new(sdk_config), table_name)
    }

    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Creates the record table with its three secondary indexes, unless it
    /// already exists.
    pub async fn create_table_if_not_exists(&self) -> Result<Option<CreateTableOutput>> {
        if self.table_exists().await? {
            info!("Table '{}' exists", self.table_name);
            return Ok(None);
        }

        let string_attribute = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
        };
        let key_element = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
        };

        let mut attribute_definitions = vec![
            string_attribute(PARTITION_KEY)?,
            string_attribute(SORT_KEY)?,
        ];
        let key_schema = vec![
            key_element(PARTITION_KEY, KeyType::Hash)?,
            key_element(SORT_KEY, KeyType::Range)?,
        ];

        let mut indexes = Vec::with_capacity(QueryTarget::INDEXES.len());
        for target in QueryTarget::INDEXES {
            let index_name = target
                .index_name()
                .ok_or_else(|| anyhow!("{target:?} is not an index"))?;

            attribute_definitions.push(string_attribute(target.key_attribute())?);
            let mut index_key_schema = vec![key_element(target.key_attribute(), KeyType::Hash)?];
            if let Some(sort_attribute) = target.sort_attribute() {
                attribute_definitions.push(string_attribute(sort_attribute)?);
                index_key_schema.push(key_element(sort_attribute, KeyType::Range)?);
            }

            indexes.push(
                GlobalSecondaryIndex::builder()
                    .index_name(index_name)
                    .set_key_schema(Some(index_key_schema))
                    .projection(
                        Projection::builder()
                            .projection_type(ProjectionType::All)
                            .build(),
                    )
                    .build()?,
            );
        }

        let output = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(BillingMode::PayPerRequest)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .set_global_secondary_indexes(Some(indexes))
            .send()
            .await?;
        info!("Table '{}' created", self.table_name);
        Ok(Some(output))
    }

    /// Checks if the record table exists.
    pub async fn table_exists(&self) -> Result<bool> {
        let tables = self.client.list_tables().send().await?;
        Ok(tables.table_names().contains(&self.table_name))
    }
}

#[async_trait]
impl RecordBackend for DynamoDb {
    async fn put_record(&self, record: Record) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_item()?.into_attributes()))
            .send()
            .await?;
        Ok(())
    }

    async fn get_record(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Item::key(partition_key, sort_key).into_attributes()))
            .send()
            .await?;

        response
            .item
            .map(|attrs| Record::from_item(Item::from(attrs)))
            .transpose()
    }

    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
        let expression = query_expression(query)?;

        debug!(
            condition = %expression.key_condition,
            index = ?query.target.index_name(),
            "Querying '{}'",
            self.table_name
        );
        let response = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_index_name(query.target.index_name().map(str::to_owned))
            .key_condition_expression(expression.key_condition)
            .set_filter_expression(expression.filter)
            .set_expression_attribute_names(Some(expression.names))
            .set_expression_attribute_values(Some(expression.values))
            .send()
            .await?;

        if response.last_evaluated_key().is_some() {
            warn!(
                key = %query.key,
                "Query on '{}' matched more than one page; only the first is returned",
                self.table_name
            );
        }

        response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|attrs| Record::from_item(Item::from(attrs)))
            .collect()
    }

    async fn update_record(&self, update: RecordUpdate) -> Result<Record> {
        let expression = update_expression(&update)?;

        let response = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(
                Item::key(&update.partition_key, &update.sort_key).into_attributes(),
            ))
            .update_expression(expression.update)
            .set_expression_attribute_names(Some(expression.names))
            .set_expression_attribute_values(Some(expression.values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await?;

        let attrs = response
            .attributes
            .ok_or_else(|| anyhow!("update of '{}' returned no attributes", self.table_name))?;
        Record::from_item(Item::from(attrs))
    }

    async fn delete_record(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        let response = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Item::key(partition_key, sort_key).into_attributes()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await?;

        response
            .attributes
            .map(|attrs| Record::from_item(Item::from(attrs)))
            .transpose()
    }
}

/// Key condition, optional filter and placeholder bindings for one query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryExpression {
    pub(crate) key_condition: String,
    pub(crate) filter: Option<String>,
    pub(crate) names: HashMap<String, String>,
    pub(crate) values: HashMap<String, AttributeValue>,
}

/// Builds the expressions for a query. A sort prefix on an index without a
/// sort key is rejected here, before any request is made.
pub(crate) fn query_expression(query: &RecordQuery) -> Result<QueryExpression> {
    let mut key_condition = String::from("#pk = :pk");
    let mut names = HashMap::from([("#pk".to_string(), query.target.key_attribute().to_string())]);
    let mut values = HashMap::from([(":pk".to_string(), AttributeValue::S(query.key.clone()))]);

    if let (Some(prefix), Some(sort_attribute)) = (&query.sort_prefix, query.prefix_attribute()?) {
        key_condition.push_str(" AND begins_with(#sk, :sk)");
        names.insert("#sk".to_string(), sort_attribute.to_string());
        values.insert(":sk".to_string(), AttributeValue::S(prefix.clone()));
    }

    let mut filter = None;
    if let Some(status) = &query.status_filter {
        filter = Some("#attributes.#status = :status".to_string());
        names.insert("#attributes".to_string(), ATTRIBUTES.to_string());
        names.insert("#status".to_string(), "status".to_string());
        values.insert(":status".to_string(), AttributeValue::S(status.clone()));
    }

    Ok(QueryExpression {
        key_condition,
        filter,
        names,
        values,
    })
}

/// `SET` expression and placeholder bindings for a partial update.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpdateExpression {
    pub(crate) update: String,
    pub(crate) names: HashMap<String, String>,
    pub(crate) values: HashMap<String, AttributeValue>,
}

/// Builds the update expression: the whole `attributes` map is replaced and
/// only the index keys present in the update are set.
pub(crate) fn update_expression(update: &RecordUpdate) -> Result<UpdateExpression> {
    let mut update_expression = String::from("SET #attributes = :attributes");
    let mut expression_attribute_names =
        HashMap::from([("#attributes".to_string(), ATTRIBUTES.to_string())]);
    let mut expression_attribute_values =
        HashMap::from([(":attributes".to_string(), to_attribute(&update.attributes)?)]);

    for (i, (attr_name, attr_value)) in update.index_keys.fields().enumerate() {
        let placeholder = format!("#idx{}", i);
        let value_placeholder = format!(":idx{}", i);

        update_expression.push_str(&format!(", {} = {}", placeholder, value_placeholder));

        expression_attribute_names.insert(placeholder, attr_name.to_string());
        expression_attribute_values
            .insert(value_placeholder, AttributeValue::S(attr_value.to_string()));
    }

    Ok(UpdateExpression {
        update: update_expression,
        names: expression_attribute_names,
        values: expression_attribute_values,
    })
}
