// Buffer & Table Configuration
//
// Loaded from JSON. Every field has a default so an empty object
// is a valid configuration.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::{gem_version, TableSchema};
use crate::store::BATCH_WRITE_LIMIT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NuggetConfig {
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Tables to provision before writing.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

/// Write buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Pending requests per table that trigger a flush.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_batch_size() -> usize {
    BATCH_WRITE_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub schema: TableSchema,

    #[serde(default = "default_capacity")]
    pub read_capacity: u64,

    #[serde(default = "default_capacity")]
    pub write_capacity: u64,
}

fn default_capacity() -> u64 {
    5
}

impl NuggetConfig {
    /// Built-in configuration (used if no config is provided).
    pub fn default_config() -> Self {
        Self {
            buffer: BufferConfig::default(),
            tables: vec![TableConfig {
                schema: gem_version::schema(),
                read_capacity: default_capacity(),
                write_capacity: default_capacity(),
            }],
        }
    }

    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.buffer.max_batch_size;
        if size == 0 || size > BATCH_WRITE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "buffer.max_batch_size must be between 1 and {BATCH_WRITE_LIMIT}, got {size}"
            )));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            table
                .schema
                .create_table_request(table.read_capacity, table.write_capacity)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;

            if !seen.insert(table.schema.table.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "table `{}` is configured twice",
                    table.schema.table
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_uses_defaults() {
        let config = NuggetConfig::from_json("{}").unwrap();

        assert_eq!(config.buffer.max_batch_size, 25);
        assert!(config.tables.is_empty());
    }

    #[test]
    fn default_config_is_valid() {
        let config = NuggetConfig::default_config();
        config.validate().unwrap();
        assert_eq!(config.tables[0].schema.table, gem_version::TABLE);
    }

    #[test]
    fn batch_size_outside_service_limit_is_rejected() {
        for size in [0, 26] {
            let json = format!(r#"{{ "buffer": {{ "max_batch_size": {size} }} }}"#);
            let err = NuggetConfig::from_json(&json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "size {size}");
        }
    }

    #[test]
    fn duplicate_tables_are_rejected() {
        let json = r#"
        {
          "tables": [
            { "schema": { "table": "T" } },
            { "schema": { "table": "T" } }
          ]
        }
        "#;

        let err = NuggetConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            {{
              "buffer": {{ "max_batch_size": 10 }},
              "tables": [
                {{
                  "schema": {{
                    "table": "Downloads",
                    "hash_key": {{ "name": "gem", "kind": "String" }},
                    "range_key": {{ "name": "date", "kind": "String" }},
                    "attributes": ["count"]
                  }},
                  "read_capacity": 2,
                  "write_capacity": 3
                }}
              ]
            }}
            "#
        )
        .unwrap();

        let config = NuggetConfig::from_path(file.path()).unwrap();

        assert_eq!(config.buffer.max_batch_size, 10);
        assert_eq!(config.tables[0].write_capacity, 3);
        assert_eq!(config.tables[0].schema.key_attributes(), vec!["gem", "date"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = NuggetConfig::from_path("/nonexistent/nugget.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
