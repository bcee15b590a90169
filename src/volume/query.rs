//! Volume lookup.

use super::{Volume, VolumeError, sectors_to_bytes};
use crate::client::DmeClient;

/// Reads the current state of a volume.
#[derive(Debug)]
pub struct Querier<'a> {
    client: &'a DmeClient,
    name: &'a str,
}

impl<'a> Querier<'a> {
    /// Prepares the lookup of `name`.
    #[must_use]
    pub const fn new(client: &'a DmeClient, name: &'a str) -> Self {
        Self { client, name }
    }

    /// Returns the volume with its capacity in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::FilesystemNotFound`] when absent.
    pub async fn query(&self) -> Result<Volume, VolumeError> {
        let filesystem = self
            .client
            .filesystem_by_name(self.name)
            .await?
            .ok_or_else(|| VolumeError::FilesystemNotFound {
                name: self.name.to_owned(),
            })?;
        Ok(Volume {
            size: sectors_to_bytes(filesystem.capacity)?,
            name: filesystem.name,
            id: filesystem.id,
        })
    }
}
