// Gem Version Specs
//
// One row per published gem version: who built it, where it lives
// and what it depends on.

use serde::{Deserialize, Serialize};

use super::{KeyDefinition, SchemaError, TableSchema};
use crate::record::{AttributeValue, Record};

pub const TABLE: &str = "GemVersionSpec";

/// Schema of the `GemVersionSpec` table.
pub fn schema() -> TableSchema {
    TableSchema::new(TABLE, KeyDefinition::string("name_version"))
        .with_range_key(KeyDefinition::string("build_date"))
        .with_attributes(["authors", "github", "dependencies", "platform"])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemVersionSpec {
    pub name: String,
    pub version: String,
    pub build_date: String,
    pub authors: String,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub platform: String,
}

impl GemVersionSpec {
    /// Hash key value, e.g. `rake[10.4.2]`.
    pub fn name_version(&self) -> String {
        format!("{}[{}]", self.name, self.version)
    }

    pub fn record(&self) -> Result<Record, SchemaError> {
        let github = match &self.github {
            Some(url) => AttributeValue::S(url.clone()),
            None => AttributeValue::Null(true),
        };
        let dependencies = AttributeValue::L(
            self.dependencies
                .iter()
                .map(|d| AttributeValue::S(d.clone()))
                .collect(),
        );

        schema().record(
            AttributeValue::S(self.name_version()),
            Some(AttributeValue::S(self.build_date.clone())),
            vec![
                AttributeValue::S(self.authors.clone()),
                github,
                dependencies,
                AttributeValue::S(self.platform.clone()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rake() -> GemVersionSpec {
        GemVersionSpec {
            name: "rake".into(),
            version: "10.4.2".into(),
            build_date: "2014-12-02".into(),
            authors: "Jim Weirich".into(),
            github: None,
            dependencies: vec!["minitest".into()],
            platform: "ruby".into(),
        }
    }

    #[test]
    fn record_uses_formatted_hash_key() {
        let record = rake().record().unwrap();

        assert_eq!(record.table, TABLE);
        assert_eq!(
            record.items["name_version"],
            AttributeValue::S("rake[10.4.2]".into())
        );
        assert_eq!(
            record.items["build_date"],
            AttributeValue::S("2014-12-02".into())
        );
        assert_eq!(record.items["github"], AttributeValue::Null(true));
        assert_eq!(record.items.len(), 6);
    }

    #[test]
    fn schema_creates_hash_and_range_table() {
        let request = schema().create_table_request(5, 5).unwrap();
        assert_eq!(request.key_schema.len(), 2);
    }
}
