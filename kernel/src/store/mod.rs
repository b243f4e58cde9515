// Store Boundary Types
//
// Request and response shapes exchanged with the key-value store.
// Field names serialize the way the store's API spells them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::Item;

pub mod client;
pub mod memory;

pub use client::StoreClient;
pub use memory::InMemoryStore;

/// Service-wide cap on write requests in one batch write call.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Per-item payload inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteRequest {
    #[serde(rename = "PutRequest")]
    Put {
        #[serde(rename = "Item")]
        item: Item,
    },
}

impl WriteRequest {
    pub fn item(&self) -> &Item {
        match self {
            WriteRequest::Put { item } => item,
        }
    }
}

/// Table name -> write requests, in submission order per table.
pub type RequestItems = BTreeMap<String, Vec<WriteRequest>>;

/// Total number of write requests across all tables.
pub fn request_count(request_items: &RequestItems) -> usize {
    request_items.values().map(Vec::len).sum()
}

/// Response of a batch write call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteOutput {
    /// Requests the store did not apply, same shape as the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unprocessed_items: Option<RequestItems>,
}

impl BatchWriteOutput {
    /// Unprocessed requests, if the store reported any non-empty set.
    pub fn unprocessed(self) -> Option<RequestItems> {
        self.unprocessed_items.filter(|items| request_count(items) > 0)
    }
}

/// Key attribute type tags accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarAttributeType {
    S,
    N,
}

/// Role of an attribute in the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "HASH")]
    Hash,

    #[serde(rename = "RANGE")]
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: ScalarAttributeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    pub read_capacity_units: u64,
    pub write_capacity_units: u64,
}

/// Parameters of a create-table call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableRequest {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub provisioned_throughput: ProvisionedThroughput,
}

/// Failures reported by the store or the path to it.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("table not found: {0}")]
    ResourceNotFound(String),

    #[error("table already exists: {0}")]
    ResourceInUse(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("provisioned throughput exceeded: {0}")]
    Throughput(String),

    #[error("transport failure: {0}")]
    Transport(String),
}
