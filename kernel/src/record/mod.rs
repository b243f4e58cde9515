// Records & Attribute Values
//
// A record is one item destined for one table. Values carry the
// store's wire tags so records can be read straight from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute name -> value, including the key attributes.
pub type Item = BTreeMap<String, AttributeValue>;

/// A single attribute value as the store understands it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),

    /// Numbers travel as their decimal string.
    #[serde(rename = "N")]
    N(String),

    #[serde(rename = "BOOL")]
    Bool(bool),

    #[serde(rename = "NULL")]
    Null(bool),

    #[serde(rename = "L")]
    L(Vec<AttributeValue>),

    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),
}

/// The kind of an attribute value, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Null,
    List,
    Map,
}

impl AttributeValue {
    pub fn number(n: i64) -> Self {
        AttributeValue::N(n.to_string())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::S(_) => ValueKind::String,
            AttributeValue::N(_) => ValueKind::Number,
            AttributeValue::Bool(_) => ValueKind::Boolean,
            AttributeValue::Null(_) => ValueKind::Null,
            AttributeValue::L(_) => ValueKind::List,
            AttributeValue::M(_) => ValueKind::Map,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Reasons a record cannot be accepted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record has no destination table")]
    EmptyTable,

    #[error("record for table `{0}` has no items")]
    EmptyItems(String),

    #[error("record for table `{table}` is missing key attribute `{attribute}`")]
    MissingKeyAttribute { table: String, attribute: String },
}

/// An entity to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub table: String,

    /// Key attribute names the items must contain.
    ///
    /// Empty when the producer did not declare its keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_attributes: Vec<String>,

    pub items: Item,
}

impl Record {
    /// Build and validate a record.
    pub fn new(
        table: impl Into<String>,
        key_attributes: Vec<String>,
        items: Item,
    ) -> Result<Self, RecordError> {
        let record = Self {
            table: table.into(),
            key_attributes,
            items,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.table.is_empty() {
            return Err(RecordError::EmptyTable);
        }

        if self.items.is_empty() {
            return Err(RecordError::EmptyItems(self.table.clone()));
        }

        if let Some(missing) = self
            .key_attributes
            .iter()
            .find(|name| !self.items.contains_key(name.as_str()))
        {
            return Err(RecordError::MissingKeyAttribute {
                table: self.table.clone(),
                attribute: missing.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn valid_record_is_accepted() {
        let record = Record::new(
            "Downloads",
            vec!["id".into()],
            items(&[("id", AttributeValue::number(7)), ("gem", "rake".into())]),
        )
        .unwrap();

        assert_eq!(record.table, "Downloads");
        assert_eq!(record.items.len(), 2);
    }

    #[test]
    fn empty_table_is_rejected() {
        let err =
            Record::new("", vec![], items(&[("id", AttributeValue::number(1))])).unwrap_err();
        assert_eq!(err, RecordError::EmptyTable);
    }

    #[test]
    fn empty_items_are_rejected() {
        let err = Record::new("Downloads", vec![], Item::new()).unwrap_err();
        assert!(matches!(err, RecordError::EmptyItems(_)));
    }

    #[test]
    fn missing_key_attribute_is_rejected() {
        let err = Record::new(
            "Downloads",
            vec!["id".into(), "date".into()],
            items(&[("id", AttributeValue::number(1))]),
        )
        .unwrap_err();

        assert_eq!(
            err,
            RecordError::MissingKeyAttribute {
                table: "Downloads".into(),
                attribute: "date".into(),
            }
        );
    }

    #[test]
    fn values_use_store_wire_tags() {
        let json = r#"
        {
          "table": "Downloads",
          "items": {
            "id": { "N": "42" },
            "gem": { "S": "rake" },
            "yanked": { "BOOL": false },
            "tags": { "L": [ { "S": "build" } ] }
          }
        }
        "#;

        let record: Record = serde_json::from_str(json).unwrap();

        assert!(record.key_attributes.is_empty());
        assert_eq!(record.items["id"], AttributeValue::number(42));
        assert_eq!(record.items["gem"].kind(), ValueKind::String);
        assert_eq!(record.items["tags"].kind(), ValueKind::List);
        record.validate().unwrap();
    }
}
