//! Capacity growth.

use std::cmp::Ordering;

use super::{VolumeError, bytes_to_sectors};
use crate::client::DmeClient;

/// Grows an existing volume.
#[derive(Debug)]
pub struct Expander<'a> {
    client: &'a DmeClient,
    name: &'a str,
}

impl<'a> Expander<'a> {
    /// Prepares the expansion of `name`.
    #[must_use]
    pub const fn new(client: &'a DmeClient, name: &'a str) -> Self {
        Self { client, name }
    }

    /// Sets the capacity to `size` bytes, rounded up to whole sectors.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::FilesystemNotFound`],
    /// [`VolumeError::ShrinkUnsupported`], [`VolumeError::PoolNotFound`], or
    /// the update failure.
    pub async fn expand(&self, size: u64) -> Result<(), VolumeError> {
        let filesystem = self
            .client
            .filesystem_by_name(self.name)
            .await?
            .ok_or_else(|| VolumeError::FilesystemNotFound {
                name: self.name.to_owned(),
            })?;
        let requested = bytes_to_sectors(size);
        match requested.cmp(&filesystem.capacity) {
            Ordering::Equal => {
                tracing::info!(volume = self.name, capacity = requested, "capacity unchanged");
                return Ok(());
            }
            Ordering::Less => {
                return Err(VolumeError::ShrinkUnsupported {
                    name: self.name.to_owned(),
                    current: filesystem.capacity,
                    requested,
                });
            }
            Ordering::Greater => {}
        }

        self.client
            .pool_by_name(&filesystem.pool_name)
            .await?
            .ok_or_else(|| VolumeError::PoolNotFound {
                pool: filesystem.pool_name.clone(),
            })?;
        self.client
            .update_filesystem_capacity(&filesystem.id, requested)
            .await?;
        tracing::info!(
            volume = self.name,
            from = filesystem.capacity,
            to = requested,
            "expanded filesystem"
        );
        Ok(())
    }
}
