//! Per-volume mutual exclusion.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

static SHARED_LOCKS: LazyLock<Arc<VolumeLocks>> = LazyLock::new(|| Arc::new(VolumeLocks::new()));

/// Registry of async mutexes keyed by backend and volume name.
///
/// Entries are never removed; one empty mutex per volume name ever seen.
#[derive(Debug, Default)]
pub struct VolumeLocks {
    locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl VolumeLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_LOCKS)
    }

    /// Waits for exclusive access to `name` on `backend_id`.
    pub async fn lock(&self, backend_id: &str, name: &str) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(
            self.locks
                .entry((backend_id.to_owned(), name.to_owned()))
                .or_default()
                .value(),
        );
        mutex.lock_owned().await
    }
}
