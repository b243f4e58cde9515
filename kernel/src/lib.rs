// Nugget Kernel
//
// Batching write buffer for a DynamoDB-style key-value store.

pub mod buffer;
pub mod config;
pub mod record;
pub mod schema;
pub mod store;
