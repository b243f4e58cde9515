// In-Memory Store
//
// A `StoreClient` that keeps tables in process memory. It enforces
// the same limits and key validation as the managed service, and
// can be told to throttle or fail so partial-failure paths can be
// driven deterministically.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use super::{
    request_count, BatchWriteOutput, CreateTableRequest, KeyType, ProvisionedThroughput,
    RequestItems, ScalarAttributeType, StoreClient, StoreError, WriteRequest, BATCH_WRITE_LIMIT,
};
use crate::record::{AttributeValue, Item};

#[derive(Debug)]
struct TableData {
    /// Hash key first, then the optional range key.
    key: Vec<(String, ScalarAttributeType)>,
    throughput: ProvisionedThroughput,
    items: BTreeMap<Vec<String>, Item>,
}

impl TableData {
    fn primary_key(&self, table: &str, item: &Item) -> Result<Vec<String>, StoreError> {
        self.key
            .iter()
            .map(|(name, expected)| match (item.get(name), expected) {
                (Some(AttributeValue::S(s)), ScalarAttributeType::S) => Ok(s.clone()),
                (Some(AttributeValue::N(n)), ScalarAttributeType::N) => Ok(n.clone()),
                (Some(other), _) => Err(StoreError::Validation(format!(
                    "key attribute `{name}` of table `{table}` must be {expected:?}, got {:?}",
                    other.kind()
                ))),
                (None, _) => Err(StoreError::Validation(format!(
                    "item for table `{table}` is missing key attribute `{name}`"
                ))),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, TableData>,
    batch_write_calls: Vec<RequestItems>,
    put_item_calls: usize,
    /// Successful calls still to let through, then the error to return.
    fail_batch_write: Option<(usize, StoreError)>,
}

impl Inner {
    fn table(&self, name: &str) -> Result<&TableData, StoreError> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::ResourceNotFound(name.to_string()))
    }
}

/// Process-local store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    write_capacity: Option<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply at most `capacity` requests per batch call; the rest come
    /// back as unprocessed items.
    pub fn with_write_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            write_capacity: Some(capacity),
        }
    }

    /// Make the next batch write call fail with `error`.
    pub fn fail_next_batch_write(&self, error: StoreError) {
        self.fail_batch_write_after(0, error);
    }

    /// Let `calls` batch write calls through, then fail the next one.
    pub fn fail_batch_write_after(&self, calls: usize, error: StoreError) {
        self.inner.lock().fail_batch_write = Some((calls, error));
    }

    pub fn tables(&self) -> Vec<String> {
        self.inner.lock().tables.keys().cloned().collect()
    }

    pub fn item_count(&self, table: &str) -> usize {
        self.inner
            .lock()
            .tables
            .get(table)
            .map(|t| t.items.len())
            .unwrap_or(0)
    }

    /// Look up an item by the key attributes present in `key`.
    pub fn get_item(&self, table: &str, key: &Item) -> Option<Item> {
        let inner = self.inner.lock();
        let data = inner.tables.get(table)?;
        let primary_key = data.primary_key(table, key).ok()?;
        data.items.get(&primary_key).cloned()
    }

    pub fn provisioned_throughput(&self, table: &str) -> Option<ProvisionedThroughput> {
        self.inner.lock().tables.get(table).map(|t| t.throughput)
    }

    /// Every request map received by `batch_write_item`, in call order.
    pub fn batch_write_calls(&self) -> Vec<RequestItems> {
        self.inner.lock().batch_write_calls.clone()
    }

    pub fn put_item_calls(&self) -> usize {
        self.inner.lock().put_item_calls
    }
}

impl StoreClient for InMemoryStore {
    fn put_item(&self, table: &str, item: &Item) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.put_item_calls += 1;

        let data = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::ResourceNotFound(table.to_string()))?;
        let primary_key = data.primary_key(table, item)?;
        data.items.insert(primary_key, item.clone());

        debug!(table, "put item");
        Ok(())
    }

    fn batch_write_item(
        &self,
        request_items: &RequestItems,
    ) -> Result<BatchWriteOutput, StoreError> {
        let mut inner = self.inner.lock();
        inner.batch_write_calls.push(request_items.clone());

        match inner.fail_batch_write.take() {
            Some((0, error)) => return Err(error),
            Some((remaining, error)) => inner.fail_batch_write = Some((remaining - 1, error)),
            None => {}
        }

        let total = request_count(request_items);
        if total == 0 {
            return Err(StoreError::Validation(
                "batch write requires at least one request".into(),
            ));
        }
        if total > BATCH_WRITE_LIMIT {
            return Err(StoreError::Validation(format!(
                "batch write carries {total} requests, limit is {BATCH_WRITE_LIMIT}"
            )));
        }

        // Validate everything before applying anything.
        let mut keyed = Vec::with_capacity(total);
        for (table, requests) in request_items {
            let data = inner.table(table)?;
            for request in requests {
                let primary_key = data.primary_key(table, request.item())?;
                keyed.push((table, primary_key, request));
            }
        }

        let capacity = self.write_capacity.unwrap_or(total);
        let mut unprocessed = RequestItems::new();

        for (applied, (table, primary_key, request)) in keyed.into_iter().enumerate() {
            if applied >= capacity {
                unprocessed
                    .entry(table.clone())
                    .or_default()
                    .push(request.clone());
                continue;
            }

            if let Some(data) = inner.tables.get_mut(table) {
                match request {
                    WriteRequest::Put { item } => {
                        data.items.insert(primary_key, item.clone());
                    }
                }
            }
        }

        debug!(
            requests = total,
            unprocessed = request_count(&unprocessed),
            "batch write"
        );

        Ok(BatchWriteOutput {
            unprocessed_items: (!unprocessed.is_empty()).then_some(unprocessed),
        })
    }

    fn create_table(&self, request: &CreateTableRequest) -> Result<(), StoreError> {
        let name = &request.table_name;
        if name.is_empty() {
            return Err(StoreError::Validation("table name must not be empty".into()));
        }

        let throughput = request.provisioned_throughput;
        if throughput.read_capacity_units == 0 || throughput.write_capacity_units == 0 {
            return Err(StoreError::Validation(format!(
                "table `{name}` needs at least one read and one write capacity unit"
            )));
        }

        let hash_count = request
            .key_schema
            .iter()
            .filter(|k| k.key_type == KeyType::Hash)
            .count();
        let range_count = request.key_schema.len() - hash_count;
        if hash_count != 1 || range_count > 1 {
            return Err(StoreError::Validation(format!(
                "table `{name}` needs exactly one HASH key and at most one RANGE key"
            )));
        }

        let mut key = Vec::with_capacity(request.key_schema.len());
        for key_type in [KeyType::Hash, KeyType::Range] {
            for element in request.key_schema.iter().filter(|k| k.key_type == key_type) {
                let definition = request
                    .attribute_definitions
                    .iter()
                    .find(|d| d.attribute_name == element.attribute_name)
                    .ok_or_else(|| {
                        StoreError::Validation(format!(
                            "key attribute `{}` has no attribute definition",
                            element.attribute_name
                        ))
                    })?;
                key.push((element.attribute_name.clone(), definition.attribute_type));
            }
        }

        let mut inner = self.inner.lock();
        if inner.tables.contains_key(name) {
            return Err(StoreError::ResourceInUse(name.clone()));
        }

        inner.tables.insert(
            name.clone(),
            TableData {
                key,
                throughput,
                items: BTreeMap::new(),
            },
        );

        debug!(table = %name, "created table");
        Ok(())
    }
}
