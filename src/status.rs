//! Backend availability reporting.

/// Receives backend online/offline transitions.
pub trait BackendStatusSink: Send + Sync {
    /// Records whether `backend_id` is currently reachable.
    fn set_online_status(&self, backend_id: &str, online: bool);
}

/// Status sink that only logs transitions.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingStatusSink;

impl BackendStatusSink for LoggingStatusSink {
    fn set_online_status(&self, backend_id: &str, online: bool) {
        if online {
            tracing::info!(backend_id, "backend online");
        } else {
            tracing::warn!(backend_id, "backend offline");
        }
    }
}
