// Store Client Abstraction
//
// Defines the capabilities the write buffer needs from the
// key-value store. Implementations may talk to a remote service,
// an emulator, or keep everything in memory.
//
// This module defines *interfaces only*.

use super::{BatchWriteOutput, CreateTableRequest, RequestItems, StoreError};
use crate::record::Item;

/// Remote store capabilities used by the buffer.
///
/// Properties required from implementations:
/// - Thread-safe (`&self` methods, shared across writers)
/// - A returned `Ok` means every request was either applied or
///   listed in the unprocessed items
///
/// Implementations MUST NOT:
/// - Silently drop requests from a batch
/// - Retry internally in a way that reorders requests of one table
pub trait StoreClient: Send + Sync {
    /// Write a single item, replacing any item with the same key.
    fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError>;

    /// Write many items across tables in one call.
    ///
    /// Implementations must reject calls carrying more than
    /// `BATCH_WRITE_LIMIT` requests in total.
    fn batch_write_item(&self, request_items: &RequestItems)
        -> Result<BatchWriteOutput, StoreError>;

    /// Create a table.
    fn create_table(&self, request: &CreateTableRequest) -> Result<(), StoreError>;
}
