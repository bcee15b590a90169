//! Authenticated client for the DME A-series REST API.
//!
//! [`DmeClient`] owns one session against one of several candidate URLs,
//! gates every request through a per-client and a per-device semaphore, and
//! re-authenticates once when a call fails with a session error. Typed
//! sub-client methods for filesystems, shares, pools, and tasks are layered
//! on top in the sibling modules.

mod envelope;
mod error;
mod filesystem;
mod gates;
mod graceful;
pub mod paths;
mod redaction;
mod session;
mod system;
mod task;
mod transport;
mod types;

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, Semaphore};

use crate::config::DmeConfig;
use crate::credentials::{AuthInfo, CredentialStore, StaticCredentials};
use crate::status::{BackendStatusSink, LoggingStatusSink};

pub use envelope::{NOT_AUTHENTICATED_CODE, QUOTA_CONTROL_CODE, SESSION_OFFLINE_CODE, decode};
pub use error::DmeError;
pub use gates::{
    DEFAULT_PARALLELISM, DeviceGates, MAX_PARALLELISM, UNINITIALIZED_DEVICE, clamp_parallelism,
};
pub use session::Session;
pub use task::{Backoff, TaskPolicy};
pub use transport::{
    AUTH_TOKEN_HEADER, Connector, HttpConnector, HttpRequest, HttpResponse, Method, Transport,
    TransportError, TransportFuture,
};
pub use types::{
    AllocationType, CreateFilesystemRequest, DataTurboAdmin, DataTurboShare, DataTurboShareParam,
    DataTurboUserAddition, Filesystem, FilesystemSpec, NfsClientAddition, NfsShare, NfsShareParam,
    Pool, Storage, SystemInfo, TaskInfo, TaskOutcome, TaskStatus, Tuning,
};

/// Physical array resolved behind a logical backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackendIdentity {
    /// Logical backend identifier.
    pub backend_id: String,
    /// DME storage identifier used to scope queries.
    pub storage_id: String,
    /// Device serial number keying the per-device gate.
    pub device_sn: String,
}

/// Session-holding client for one backend.
pub struct DmeClient {
    backend_id: String,
    urls: Vec<String>,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialStore>,
    status_sink: Arc<dyn BackendStatusSink>,
    client_gate: Semaphore,
    device_gates: Arc<DeviceGates>,
    task_policy: TaskPolicy,
    session: RwLock<Option<Arc<Session>>>,
    relogin_lock: Mutex<()>,
    identity: OnceLock<BackendIdentity>,
}

impl fmt::Debug for DmeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmeClient")
            .field("backend_id", &self.backend_id)
            .field("urls", &self.urls)
            .field("task_policy", &self.task_policy)
            .field("identity", &self.identity.get())
            .finish_non_exhaustive()
    }
}

impl DmeClient {
    /// Starts building a client for `backend_id` with its candidate URLs.
    #[must_use]
    pub fn builder<I, S>(backend_id: impl Into<String>, urls: I) -> DmeClientBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DmeClientBuilder {
            backend_id: backend_id.into(),
            urls: urls.into_iter().map(Into::into).collect(),
            connector: None,
            credentials: None,
            status_sink: None,
            parallelism: DEFAULT_PARALLELISM,
            task_policy: TaskPolicy::default(),
            device_gates: None,
        }
    }

    /// Builds a production client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DmeError::Config`] when the configuration is incomplete.
    pub fn from_config(config: &DmeConfig) -> Result<Self, DmeError> {
        config
            .validate()
            .map_err(|err| DmeError::Config(err.to_string()))?;
        let credentials = StaticCredentials::new().with_backend(
            config.backend_id.clone(),
            AuthInfo::new(config.user.clone(), config.password.clone()),
        );
        Self::builder(config.backend_id.clone(), config.url_list())
            .connector(HttpConnector::new(
                Duration::from_secs(config.request_timeout_secs),
                config.insecure_skip_verify,
            ))
            .credentials(credentials)
            .status_sink(LoggingStatusSink)
            .parallelism(config.parallel_num)
            .task_policy(config.task_policy())
            .build()
    }

    /// Returns the logical backend identifier.
    #[must_use]
    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// Returns the resolved array identity, once the first login succeeded.
    #[must_use]
    pub fn identity(&self) -> Option<&BackendIdentity> {
        self.identity.get()
    }

    /// Returns the policy used when waiting for tasks.
    #[must_use]
    pub const fn task_policy(&self) -> &TaskPolicy {
        &self.task_policy
    }
}

/// Builder for [`DmeClient`].
pub struct DmeClientBuilder {
    backend_id: String,
    urls: Vec<String>,
    connector: Option<Arc<dyn Connector>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    status_sink: Option<Arc<dyn BackendStatusSink>>,
    parallelism: usize,
    task_policy: TaskPolicy,
    device_gates: Option<Arc<DeviceGates>>,
}

impl fmt::Debug for DmeClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmeClientBuilder")
            .field("backend_id", &self.backend_id)
            .field("urls", &self.urls)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl DmeClientBuilder {
    /// Sets the transport connector.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Sets the credential store.
    #[must_use]
    pub fn credentials(mut self, credentials: impl CredentialStore + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Sets the sink notified when the backend goes offline.
    #[must_use]
    pub fn status_sink(mut self, sink: impl BackendStatusSink + 'static) -> Self {
        self.status_sink = Some(Arc::new(sink));
        self
    }

    /// Sets the shared status sink.
    #[must_use]
    pub fn shared_status_sink(mut self, sink: Arc<dyn BackendStatusSink>) -> Self {
        self.status_sink = Some(sink);
        self
    }

    /// Sets the number of concurrent requests, clamped to `[1, 30]`.
    #[must_use]
    pub fn parallelism(mut self, requested: u32) -> Self {
        self.parallelism = clamp_parallelism(requested);
        self
    }

    /// Sets the task waiting policy.
    #[must_use]
    pub const fn task_policy(mut self, policy: TaskPolicy) -> Self {
        self.task_policy = policy;
        self
    }

    /// Uses a dedicated device gate registry instead of the process-wide one.
    #[must_use]
    pub fn device_gates(mut self, gates: Arc<DeviceGates>) -> Self {
        self.device_gates = Some(gates);
        self
    }

    /// Finalises the client.
    ///
    /// # Errors
    ///
    /// Returns [`DmeError::Config`] when no URL, connector, or credential
    /// store was supplied.
    pub fn build(self) -> Result<DmeClient, DmeError> {
        let urls: Vec<String> = self
            .urls
            .into_iter()
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(DmeError::Config(format!(
                "backend {} has no candidate URLs",
                self.backend_id
            )));
        }
        let connector = self
            .connector
            .ok_or_else(|| DmeError::Config(String::from("a transport connector is required")))?;
        let credentials = self
            .credentials
            .ok_or_else(|| DmeError::Config(String::from("a credential store is required")))?;

        Ok(DmeClient {
            backend_id: self.backend_id,
            urls,
            connector,
            credentials,
            status_sink: self
                .status_sink
                .unwrap_or_else(|| Arc::new(LoggingStatusSink)),
            client_gate: Semaphore::new(self.parallelism),
            device_gates: self.device_gates.unwrap_or_else(DeviceGates::shared),
            task_policy: self.task_policy,
            session: RwLock::new(None),
            relogin_lock: Mutex::new(()),
            identity: OnceLock::new(),
        })
    }
}
