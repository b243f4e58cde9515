// Table Schemas
//
// Describes a table's primary key and named attributes, builds
// records that conform to it, and turns it into the parameters of
// a create-table call.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::record::{AttributeValue, Item, Record, RecordError, ValueKind};
use crate::store::{
    AttributeDefinition, CreateTableRequest, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};

pub mod gem_version;

/// A key attribute: name plus the kind of value it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub name: String,
    pub kind: ValueKind,
}

impl KeyDefinition {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Number)
    }
}

impl Default for KeyDefinition {
    fn default() -> Self {
        Self::number("id")
    }
}

/// Errors produced while building records or table requests.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("table name must not be empty")]
    EmptyTableName,

    #[error("schema for `{0}` has an empty name")]
    EmptyName(String),

    #[error("table `{table}` uses `{name}` as both hash and range key")]
    DuplicateKeyName { table: String, name: String },

    #[error("table `{table}` declares attribute `{name}` twice or as a key")]
    DuplicateAttribute { table: String, name: String },

    #[error("key `{name}` has kind {kind:?}, only String and Number keys are supported")]
    UnsupportedKeyType { name: String, kind: ValueKind },

    #[error("key `{name}` expects {expected:?}, got {actual:?}")]
    KeyTypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("table `{0}` declares a range key but no range value was given")]
    MissingRangeValue(String),

    #[error("table `{0}` has no range key but a range value was given")]
    UnexpectedRangeValue(String),

    #[error("capacity units must be at least 1, got read={read} write={write}")]
    InvalidCapacity { read: u64, write: u64 },

    #[error("invalid record: {0}")]
    Record(#[from] RecordError),
}

/// Map a key kind to the store's type tag.
pub(crate) fn scalar_type(key: &KeyDefinition) -> Result<ScalarAttributeType, SchemaError> {
    match key.kind {
        ValueKind::String => Ok(ScalarAttributeType::S),
        ValueKind::Number => Ok(ScalarAttributeType::N),
        kind => Err(SchemaError::UnsupportedKeyType {
            name: key.name.clone(),
            kind,
        }),
    }
}

/// Shape of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,

    #[serde(default)]
    pub hash_key: KeyDefinition,

    #[serde(default)]
    pub range_key: Option<KeyDefinition>,

    /// Non-key attribute names, in positional order.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, hash_key: KeyDefinition) -> Self {
        Self {
            table: table.into(),
            hash_key,
            range_key: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_range_key(mut self, range_key: KeyDefinition) -> Self {
        self.range_key = Some(range_key);
        self
    }

    pub fn with_attributes<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Hash key name, then the range key name if any.
    pub fn key_attributes(&self) -> Vec<String> {
        std::iter::once(&self.hash_key)
            .chain(self.range_key.as_ref())
            .map(|k| k.name.clone())
            .collect()
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.table.is_empty() {
            return Err(SchemaError::EmptyTableName);
        }

        for key in std::iter::once(&self.hash_key).chain(self.range_key.as_ref()) {
            if key.name.is_empty() {
                return Err(SchemaError::EmptyName(self.table.clone()));
            }
            scalar_type(key)?;
        }

        if let Some(range) = &self.range_key {
            if range.name == self.hash_key.name {
                return Err(SchemaError::DuplicateKeyName {
                    table: self.table.clone(),
                    name: range.name.clone(),
                });
            }
        }

        let mut seen: HashSet<String> = self.key_attributes().into_iter().collect();
        for name in &self.attributes {
            if name.is_empty() {
                return Err(SchemaError::EmptyName(self.table.clone()));
            }
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateAttribute {
                    table: self.table.clone(),
                    name: name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Build a record for this table.
    ///
    /// Non-key `values` pair positionally with `attributes`; surplus
    /// names without a value are left out of the item.
    pub fn record(
        &self,
        hash_value: AttributeValue,
        range_value: Option<AttributeValue>,
        values: Vec<AttributeValue>,
    ) -> Result<Record, SchemaError> {
        self.validate()?;

        let mut items = Item::new();

        check_kind(&self.hash_key, &hash_value)?;
        items.insert(self.hash_key.name.clone(), hash_value);

        match (&self.range_key, range_value) {
            (Some(key), Some(value)) => {
                check_kind(key, &value)?;
                items.insert(key.name.clone(), value);
            }
            (Some(_), None) => return Err(SchemaError::MissingRangeValue(self.table.clone())),
            (None, Some(_)) => return Err(SchemaError::UnexpectedRangeValue(self.table.clone())),
            (None, None) => {}
        }

        for (name, value) in self.attributes.iter().zip(values) {
            items.insert(name.clone(), value);
        }

        Ok(Record::new(self.table.clone(), self.key_attributes(), items)?)
    }

    /// Parameters for creating this table.
    ///
    /// The range key is optional: without one the request carries a
    /// single attribute definition and a single key schema entry.
    pub fn create_table_request(
        &self,
        read_capacity: u64,
        write_capacity: u64,
    ) -> Result<CreateTableRequest, SchemaError> {
        self.validate()?;

        if read_capacity == 0 || write_capacity == 0 {
            return Err(SchemaError::InvalidCapacity {
                read: read_capacity,
                write: write_capacity,
            });
        }

        let keys = std::iter::once((&self.hash_key, KeyType::Hash))
            .chain(self.range_key.as_ref().map(|k| (k, KeyType::Range)));

        let mut attribute_definitions = Vec::new();
        let mut key_schema = Vec::new();

        for (key, key_type) in keys {
            attribute_definitions.push(AttributeDefinition {
                attribute_name: key.name.clone(),
                attribute_type: scalar_type(key)?,
            });
            key_schema.push(KeySchemaElement {
                attribute_name: key.name.clone(),
                key_type,
            });
        }

        Ok(CreateTableRequest {
            table_name: self.table.clone(),
            attribute_definitions,
            key_schema,
            provisioned_throughput: ProvisionedThroughput {
                read_capacity_units: read_capacity,
                write_capacity_units: write_capacity,
            },
        })
    }
}

fn check_kind(key: &KeyDefinition, value: &AttributeValue) -> Result<(), SchemaError> {
    if value.kind() == key.kind {
        Ok(())
    } else {
        Err(SchemaError::KeyTypeMismatch {
            name: key.name.clone(),
            expected: key.kind,
            actual: value.kind(),
        })
    }
}
