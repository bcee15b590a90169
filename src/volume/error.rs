//! Error types for volume lifecycle operations.

use thiserror::Error;

use super::Protocol;
use crate::client::DmeError;

/// Errors raised by [`super::VolumeEngine`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VolumeError {
    /// Propagates a client, session, or task failure.
    #[error(transparent)]
    Client(#[from] DmeError),
    /// Raised when request parameters are unusable.
    #[error("invalid volume request: {0}")]
    Validation(String),
    /// Raised when the requested storage pool does not exist.
    #[error("storage pool {pool} not found")]
    PoolNotFound {
        /// Pool name that was looked up.
        pool: String,
    },
    /// Raised when none of the DataTurbo users is a known administrator.
    #[error("none of the DataTurbo users for volume {volume} exist on the array")]
    NoAdministrators {
        /// Volume being created.
        volume: String,
    },
    /// Raised when the filesystem behind a volume does not exist.
    #[error("filesystem {name} not found")]
    FilesystemNotFound {
        /// Volume name.
        name: String,
    },
    /// Raised when an expansion asks for less capacity than present.
    #[error("volume {name} cannot shrink from {current} to {requested} sectors")]
    ShrinkUnsupported {
        /// Volume name.
        name: String,
        /// Current capacity in sectors.
        current: u64,
        /// Requested capacity in sectors.
        requested: u64,
    },
    /// Raised when a filesystem exists without its protocol share.
    #[error("filesystem {name} exists without its {protocol} share")]
    PartiallyProvisioned {
        /// Volume name.
        name: String,
        /// Protocol whose share is missing.
        protocol: Protocol,
    },
    /// Raised when a created filesystem or share cannot be found afterwards.
    #[error("volume {name} is not visible after creation")]
    NotVisibleAfterCreate {
        /// Volume name.
        name: String,
    },
    /// Raised when a capacity does not fit in bytes.
    #[error("capacity of {sectors} sectors overflows a byte count")]
    CapacityOverflow {
        /// Capacity in sectors.
        sectors: u64,
    },
}

impl VolumeError {
    /// Returns `true` when the array refused creation under quota control.
    #[must_use]
    pub fn is_quota_control(&self) -> bool {
        matches!(self, Self::Client(err) if err.is_quota_control())
    }
}
