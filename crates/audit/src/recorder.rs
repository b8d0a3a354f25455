use std::sync::Arc;

use tracing::{debug, warn};

use crate::entry::{AuditLogEntry, AuditRecord};
use crate::store::AuditStore;

/// Fire-and-forget entry point for audit writes.
///
/// `record` returns before the write starts. Store failures (and panics inside
/// the store) are logged at debug level and discarded; nothing is retried and
/// nothing reaches the caller.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl core::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("store", &self.store.name())
            .finish()
    }
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub fn record(&self, entry: AuditLogEntry) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(action = %entry.action(), "no async runtime; audit entry dropped");
            return;
        };

        let store = Arc::clone(&self.store);
        let record = AuditRecord::from(entry);
        handle.spawn(async move {
            let action = record.action.clone();
            if let Err(e) = store.insert(record).await {
                debug!(store = %store.name(), action = %action, error = %e, "audit write failed");
            }
        });
    }
}
