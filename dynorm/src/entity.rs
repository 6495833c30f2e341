//! Entity contract and key metadata
//!
//! Any type that wants to be stored implements [`Entity`] and describes, per
//! value, how it maps onto a table:
//! - Table name
//! - Partition key (always) and sort key (composite keys only)
//! - Secondary index routing (optional)

use aws_sdk_dynamodb::types::AttributeValue;

use crate::client::Item;

/// A storable type
///
/// `meta_info` is called on every operation, so it should be a cheap
/// projection of the value's current fields.
pub trait Entity {
    fn meta_info(&self) -> MetaInfo;
}

/// Sort key value, either a string (`S`) or a 64-bit integer (`N`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyValue {
    String(String),
    Int(i64),
}

impl SortKeyValue {
    /// An empty string counts as no value
    pub fn is_empty(&self) -> bool {
        matches!(self, SortKeyValue::String(s) if s.is_empty())
    }

    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            SortKeyValue::String(s) => AttributeValue::S(s.clone()),
            SortKeyValue::Int(n) => AttributeValue::N(n.to_string()),
        }
    }
}

impl From<String> for SortKeyValue {
    fn from(value: String) -> Self {
        SortKeyValue::String(value)
    }
}

impl From<&str> for SortKeyValue {
    fn from(value: &str) -> Self {
        SortKeyValue::String(value.to_string())
    }
}

impl From<i64> for SortKeyValue {
    fn from(value: i64) -> Self {
        SortKeyValue::Int(value)
    }
}

/// Secondary index an entity can be queried through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    /// Index name
    pub name: String,
    /// Partition key attribute of the index
    pub key: String,
    /// Value to match on the index key
    pub key_value: String,
}

/// How one entity value maps onto the store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaInfo {
    /// Table name
    pub table: String,
    /// Partition key attribute name
    pub partition_key: String,
    /// Partition key value
    pub partition_key_value: String,
    /// Sort key attribute name (composite keys only)
    pub sort_key: Option<String>,
    /// Sort key value (composite keys only)
    pub sort_key_value: Option<SortKeyValue>,
    /// Secondary index routing
    pub index: Option<SecondaryIndex>,
}

impl MetaInfo {
    pub fn new(
        table: impl Into<String>,
        partition_key: impl Into<String>,
        partition_key_value: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            partition_key: partition_key.into(),
            partition_key_value: partition_key_value.into(),
            ..Default::default()
        }
    }

    pub fn with_sort_key(mut self, name: impl Into<String>, value: impl Into<SortKeyValue>) -> Self {
        self.sort_key = Some(name.into());
        self.sort_key_value = Some(value.into());
        self
    }

    pub fn with_index(
        mut self,
        name: impl Into<String>,
        key: impl Into<String>,
        key_value: impl Into<String>,
    ) -> Self {
        self.index = Some(SecondaryIndex {
            name: name.into(),
            key: key.into(),
            key_value: key_value.into(),
        });
        self
    }

    /// Sort key name and value, only when both are present and non-empty
    pub fn sort_key_pair(&self) -> Option<(&str, &SortKeyValue)> {
        match (&self.sort_key, &self.sort_key_value) {
            (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => {
                Some((name.as_str(), value))
            }
            _ => None,
        }
    }

    /// Primary key map for point requests
    ///
    /// The partition key is always present. The sort key is added only when
    /// both its name and value are set, never half-populated.
    pub fn key(&self) -> Item {
        let mut key = Item::new();
        key.insert(
            self.partition_key.clone(),
            AttributeValue::S(self.partition_key_value.clone()),
        );
        if let Some((name, value)) = self.sort_key_pair() {
            key.insert(name.to_string(), value.to_attribute_value());
        }
        key
    }
}
