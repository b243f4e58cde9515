// Batching Write Buffer
//
// Accumulates record writes per table and sends them to the store
// as batch write calls. Requests the store reports as unprocessed
// are kept in an append-only log for the caller to inspect.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::BufferConfig;
use crate::record::{Record, RecordError};
use crate::schema::{SchemaError, TableSchema};
use crate::store::{
    request_count, RequestItems, StoreClient, StoreError, WriteRequest, BATCH_WRITE_LIMIT,
};

/// Errors surfaced by buffer operations.
///
/// Partially processed batches are not errors; they land in the
/// unprocessed log.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Write buffer in front of a `StoreClient`.
///
/// All methods take `&self`; share the buffer between threads with
/// an `Arc` or scoped borrows.
#[derive(Debug)]
pub struct BatchBuffer<S: StoreClient> {
    store: S,
    max_batch_size: usize,
    pending: Mutex<RequestItems>,
    unprocessed: Mutex<Vec<RequestItems>>,
}

impl<S: StoreClient> BatchBuffer<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, &BufferConfig::default())
    }

    /// The batch size is clamped to `1..=BATCH_WRITE_LIMIT`.
    pub fn with_config(store: S, config: &BufferConfig) -> Self {
        Self {
            store,
            max_batch_size: config.max_batch_size.clamp(1, BATCH_WRITE_LIMIT),
            pending: Mutex::new(RequestItems::new()),
            unprocessed: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Append a put request for `record` to its table's pending batch.
    pub fn enqueue(&self, record: &Record) -> Result<&Self, BufferError> {
        record.validate()?;

        let pending_len = {
            let mut pending = self.pending.lock();
            let requests = pending.entry(record.table.clone()).or_default();
            requests.push(WriteRequest::Put {
                item: record.items.clone(),
            });
            requests.len()
        };

        debug!(table = %record.table, pending = pending_len, "enqueued record");
        Ok(self)
    }

    /// Enqueue, then flush once the record's table holds a full batch.
    ///
    /// The length check takes the lock a second time instead of
    /// running inside the enqueue section, so records from other
    /// threads may land in between; they ride along with the next
    /// flush. The trigger is `>=` so a table pushed past the
    /// threshold by concurrent writers still flushes.
    pub fn enqueue_and_maybe_flush(&self, record: &Record) -> Result<(), BufferError> {
        self.enqueue(record)?;

        if self.pending_len(&record.table) >= self.max_batch_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Send every pending request to the store.
    ///
    /// Holds the pending lock for the whole flush, store calls
    /// included. Pending requests are split into calls of at most
    /// `max_batch_size` requests across all tables, which never exceeds
    /// `BATCH_WRITE_LIMIT`. If a call fails, its requests
    /// and those of the calls not yet sent stay pending and the error
    /// is returned; calls that already succeeded are not repeated.
    pub fn flush(&self) -> Result<&Self, BufferError> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Ok(self);
        }

        let requests = request_count(&pending);
        let mut calls =
            split_calls(std::mem::take(&mut *pending), self.max_batch_size).into_iter();
        let mut sent = 0;
        let mut unprocessed_requests = 0;

        while let Some(batch) = calls.next() {
            match self.store.batch_write_item(&batch) {
                Ok(output) => {
                    sent += 1;
                    if let Some(unprocessed) = output.unprocessed() {
                        let count = request_count(&unprocessed);
                        warn!(unprocessed = count, "store left requests unprocessed");
                        unprocessed_requests += count;
                        self.unprocessed.lock().push(unprocessed);
                    }
                }
                Err(error) => {
                    let mut restored = batch;
                    for rest in calls {
                        merge_into(&mut restored, rest);
                    }
                    warn!(
                        %error,
                        calls_sent = sent,
                        still_pending = request_count(&restored),
                        "batch write failed"
                    );
                    *pending = restored;
                    return Err(error.into());
                }
            }
        }

        info!(
            calls = sent,
            requests,
            unprocessed = unprocessed_requests,
            "flushed pending writes"
        );
        Ok(self)
    }

    /// Write `record` straight to the store, bypassing the batch.
    pub fn save_immediately(&self, record: &Record) -> Result<(), BufferError> {
        record.validate()?;
        self.store.put_item(&record.table, &record.items)?;
        debug!(table = %record.table, "saved record");
        Ok(())
    }

    pub fn create_table(
        &self,
        schema: &TableSchema,
        read_capacity: u64,
        write_capacity: u64,
    ) -> Result<&Self, BufferError> {
        let request = schema.create_table_request(read_capacity, write_capacity)?;
        self.store.create_table(&request)?;
        info!(
            table = %schema.table,
            read_capacity,
            write_capacity,
            "created table"
        );
        Ok(self)
    }

    pub fn pending_len(&self, table: &str) -> usize {
        self.pending.lock().get(table).map(Vec::len).unwrap_or(0)
    }

    pub fn pending_total(&self) -> usize {
        request_count(&self.pending.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Snapshot of the unprocessed log, one entry per affected call.
    pub fn unprocessed_items(&self) -> Vec<RequestItems> {
        self.unprocessed.lock().clone()
    }
}

/// Cut pending requests into calls of at most `limit` requests,
/// keeping table order and per-table submission order.
fn split_calls(pending: RequestItems, limit: usize) -> Vec<RequestItems> {
    let mut calls = Vec::new();
    let mut current = RequestItems::new();
    let mut count = 0;

    for (table, requests) in pending {
        for request in requests {
            if count == limit {
                calls.push(std::mem::take(&mut current));
                count = 0;
            }
            current.entry(table.clone()).or_default().push(request);
            count += 1;
        }
    }

    if count > 0 {
        calls.push(current);
    }
    calls
}

fn merge_into(target: &mut RequestItems, source: RequestItems) {
    for (table, requests) in source {
        target.entry(table).or_default().extend(requests);
    }
}
