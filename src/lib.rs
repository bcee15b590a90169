//! Control-plane client for DME A-series storage arrays.
//!
//! The crate turns the array's REST API into idempotent volume operations
//! for CSI controllers: [`DmeClient`] manages the authenticated session,
//! retries once across re-authentication, and waits for asynchronous tasks,
//! while [`VolumeEngine`] composes those calls into create, delete, expand,
//! and query with rollback of partial creations.

pub mod client;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod status;
pub mod test_support;
pub mod volume;

pub use client::{BackendIdentity, DmeClient, DmeClientBuilder, DmeError, TaskPolicy};
pub use config::{ConfigError, DmeConfig};
pub use credentials::{AuthInfo, CredentialStore, StaticCredentials};
pub use status::{BackendStatusSink, LoggingStatusSink};
pub use volume::{CreateVolumeParams, Protocol, Volume, VolumeEngine, VolumeError};
