//! Admission gates limiting outstanding requests per client and per device.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tokio::sync::Semaphore;

/// Bucket used before a client has resolved its device serial number.
pub const UNINITIALIZED_DEVICE: &str = "uninitialized";
/// Default number of concurrent requests per client.
pub const DEFAULT_PARALLELISM: usize = 5;
/// Upper bound for per-client parallelism and per-device capacity.
pub const MAX_PARALLELISM: usize = 30;

static SHARED_GATES: LazyLock<Arc<DeviceGates>> =
    LazyLock::new(|| Arc::new(DeviceGates::new(MAX_PARALLELISM)));

/// Clamps a configured parallelism to `[1, MAX_PARALLELISM]`.
#[must_use]
pub fn clamp_parallelism(requested: u32) -> usize {
    usize::try_from(requested)
        .unwrap_or(MAX_PARALLELISM)
        .clamp(1, MAX_PARALLELISM)
}

/// Registry of per-device semaphores.
///
/// All clients that talk to the same physical array share one semaphore, so
/// the registry must be shared between them; [`DeviceGates::shared`] returns
/// the process-wide instance.
#[derive(Debug)]
pub struct DeviceGates {
    capacity: usize,
    gates: DashMap<String, Arc<Semaphore>>,
}

impl DeviceGates {
    /// Creates an empty registry whose gates admit `capacity` requests.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            gates: DashMap::new(),
        }
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_GATES)
    }

    /// Returns the gate for `device_sn`, creating it on first use.
    #[must_use]
    pub fn gate(&self, device_sn: Option<&str>) -> Arc<Semaphore> {
        let key = device_sn
            .map(str::trim)
            .filter(|sn| !sn.is_empty())
            .unwrap_or(UNINITIALIZED_DEVICE);
        Arc::clone(
            self.gates
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(self.capacity)))
                .value(),
        )
    }
}
