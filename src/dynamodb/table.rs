/// Partition key attribute of every record.
pub const PARTITION_KEY: &str = "PK";
/// Sort key attribute of every record.
pub const SORT_KEY: &str = "SK";
/// The single nested column holding the business payload.
pub const ATTRIBUTES: &str = "attributes";

pub const INDEX1_KEY: &str = "GSI1PK";
pub const INDEX1_SORT_KEY: &str = "GSI1SK";
pub const INDEX2_KEY: &str = "GSI2PK";
pub const INDEX3_KEY: &str = "GSI3PK";

/// Where a query is evaluated: the base table or one of the three global
/// secondary indexes.
///
/// # Key layout
///
/// | target   | index name | key attribute | sort attribute |
/// |----------|------------|---------------|----------------|
/// | `Table`  | -          | `PK`          | `SK`           |
/// | `Index1` | `GSI1`     | `GSI1PK`      | `GSI1SK`       |
/// | `Index2` | `GSI2PK`   | `GSI2PK`      | -              |
/// | `Index3` | `GSI3PK`   | `GSI3PK`      | -              |
///
/// Secondary indexes are sparse: a record only appears in an index when it
/// carries every key attribute of that index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTarget {
    Table,
    Index1,
    Index2,
    Index3,
}

impl QueryTarget {
    /// Every secondary index, in provisioning order.
    pub const INDEXES: [QueryTarget; 3] = [Self::Index1, Self::Index2, Self::Index3];

    /// Name of the index to query, `None` for the base table.
    pub fn index_name(self) -> Option<&'static str> {
        match self {
            Self::Table => None,
            Self::Index1 => Some("GSI1"),
            Self::Index2 => Some("GSI2PK"),
            Self::Index3 => Some("GSI3PK"),
        }
    }

    pub fn key_attribute(self) -> &'static str {
        match self {
            Self::Table => PARTITION_KEY,
            Self::Index1 => INDEX1_KEY,
            Self::Index2 => INDEX2_KEY,
            Self::Index3 => INDEX3_KEY,
        }
    }

    /// Sort attribute usable in a `begins_with` condition, if the target has one.
    pub fn sort_attribute(self) -> Option<&'static str> {
        match self {
            Self::Table => Some(SORT_KEY),
            Self::Index1 => Some(INDEX1_SORT_KEY),
            Self::Index2 | Self::Index3 => None,
        }
    }
}
