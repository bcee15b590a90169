//! Volume lifecycle on top of [`DmeClient`].
//!
//! Every operation holds the per-volume lock for its duration and builds a
//! dedicated worker: [`Creator`], [`Deleter`], [`Expander`], or [`Querier`].

mod create;
mod delete;
mod error;
mod expand;
mod locks;
mod query;
pub mod transaction;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::client::DmeClient;

pub use create::Creator;
pub use delete::Deleter;
pub use error::VolumeError;
pub use expand::Expander;
pub use locks::VolumeLocks;
pub use query::Querier;

/// Bytes per array capacity unit.
pub const SECTOR_SIZE: u64 = 512;

/// Converts bytes to sectors, rounding up.
#[must_use]
pub const fn bytes_to_sectors(bytes: u64) -> u64 {
    bytes.div_ceil(SECTOR_SIZE)
}

/// Converts sectors to bytes.
///
/// # Errors
///
/// Returns [`VolumeError::CapacityOverflow`] when the result exceeds `u64`.
pub const fn sectors_to_bytes(sectors: u64) -> Result<u64, VolumeError> {
    match sectors.checked_mul(SECTOR_SIZE) {
        Some(bytes) => Ok(bytes),
        None => Err(VolumeError::CapacityOverflow { sectors }),
    }
}

/// Export path of a volume's share.
#[must_use]
pub fn share_path(name: &str) -> String {
    format!("/{name}/")
}

/// A provisioned volume as seen by the orchestrator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Volume name; also the filesystem name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Filesystem identifier.
    pub id: String,
}

/// Share protocol used to export a volume.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protocol {
    /// NFS with client-based ACLs.
    Nfs,
    /// DataTurbo with user-based ACLs.
    DataTurbo,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nfs => "nfs",
            Self::DataTurbo => "dtfs",
        })
    }
}

impl FromStr for Protocol {
    type Err = VolumeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nfs" => Ok(Self::Nfs),
            "dtfs" | "dataturbo" => Ok(Self::DataTurbo),
            other => Err(VolumeError::Validation(format!(
                "unsupported protocol {other:?}; expected nfs or dtfs"
            ))),
        }
    }
}

/// Parameters of a volume creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateVolumeParams {
    /// Volume and filesystem name.
    pub name: String,
    /// Requested size in bytes.
    pub size: u64,
    /// Pool to allocate from.
    pub pool_name: String,
    /// Export protocol.
    pub protocol: Protocol,
    /// NFS clients granted access.
    pub authorized_clients: Vec<String>,
    /// DataTurbo users granted access.
    pub authorized_users: Vec<String>,
    /// Map every NFS user to the anonymous user.
    pub all_squash: bool,
    /// Map the NFS root user to the anonymous user.
    pub root_squash: bool,
    /// Filesystem description.
    pub description: Option<String>,
    /// Allocation type; only `thin` and `thick` are forwarded.
    pub allocation_type: Option<String>,
}

impl CreateVolumeParams {
    /// Creates parameters with no ACL entries and squashing enabled.
    pub fn new(
        name: impl Into<String>,
        size: u64,
        pool_name: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            pool_name: pool_name.into(),
            protocol,
            authorized_clients: Vec::new(),
            authorized_users: Vec::new(),
            all_squash: true,
            root_squash: true,
            description: None,
            allocation_type: None,
        }
    }
}

fn require_name(name: &str) -> Result<(), VolumeError> {
    if name.trim().is_empty() {
        return Err(VolumeError::Validation(String::from(
            "volume name must not be empty",
        )));
    }
    Ok(())
}

/// Entry point for volume operations against one backend.
#[derive(Clone, Debug)]
pub struct VolumeEngine {
    client: Arc<DmeClient>,
    locks: Arc<VolumeLocks>,
}

impl VolumeEngine {
    /// Creates an engine using the process-wide volume locks.
    #[must_use]
    pub fn new(client: Arc<DmeClient>) -> Self {
        Self::with_locks(client, VolumeLocks::shared())
    }

    /// Creates an engine with a dedicated lock registry.
    #[must_use]
    pub const fn with_locks(client: Arc<DmeClient>, locks: Arc<VolumeLocks>) -> Self {
        Self { client, locks }
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &Arc<DmeClient> {
        &self.client
    }

    /// Performs the initial login.
    ///
    /// # Errors
    ///
    /// Propagates the login failure.
    pub async fn connect(&self) -> Result<(), VolumeError> {
        self.client.login().await?;
        Ok(())
    }

    /// Creates a volume, or confirms it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError`] when validation, provisioning, or the array
    /// fails; non-quota failures are rolled back first.
    pub async fn create(&self, params: CreateVolumeParams) -> Result<Volume, VolumeError> {
        require_name(&params.name)?;
        if params.size == 0 {
            return Err(VolumeError::Validation(String::from(
                "volume size must be greater than zero",
            )));
        }
        let _guard = self.locks.lock(self.client.backend_id(), &params.name).await;
        tracing::info!(backend_id = %self.client.backend_id(), volume = %params.name, size = params.size, protocol = %params.protocol, "creating volume");
        Creator::new(Arc::clone(&self.client), params).create().await
    }

    /// Deletes a volume; absent resources count as deleted.
    ///
    /// # Errors
    ///
    /// Returns the first deletion failure.
    pub async fn delete(&self, name: &str) -> Result<(), VolumeError> {
        require_name(name)?;
        let _guard = self.locks.lock(self.client.backend_id(), name).await;
        tracing::info!(backend_id = %self.client.backend_id(), volume = name, "deleting volume");
        Deleter::new(&self.client, name).delete().await
    }

    /// Grows a volume to `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::FilesystemNotFound`] or
    /// [`VolumeError::ShrinkUnsupported`] for unusable requests.
    pub async fn expand(&self, name: &str, size: u64) -> Result<(), VolumeError> {
        require_name(name)?;
        let _guard = self.locks.lock(self.client.backend_id(), name).await;
        tracing::info!(backend_id = %self.client.backend_id(), volume = name, size, "expanding volume");
        Expander::new(&self.client, name).expand(size).await
    }

    /// Returns the current state of a volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::FilesystemNotFound`] when the volume is absent.
    pub async fn query(&self, name: &str) -> Result<Volume, VolumeError> {
        require_name(name)?;
        let _guard = self.locks.lock(self.client.backend_id(), name).await;
        Querier::new(&self.client, name).query().await
    }
}
