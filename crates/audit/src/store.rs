use std::sync::Mutex;

use async_trait::async_trait;

use crate::entry::AuditRecord;
use crate::error::AuditStoreError;

/// Append-only destination for audit rows.
#[async_trait]
pub trait AuditStore: Send + Sync {
    fn name(&self) -> &str;

    async fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError>;
}

/// Keeps rows in memory (tests / local development).
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: AuditRecord) -> Result<(), AuditStoreError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}
