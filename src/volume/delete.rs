//! Idempotent volume teardown.

use super::{VolumeError, share_path};
use crate::client::DmeClient;

/// Removes a volume's shares and filesystem.
#[derive(Debug)]
pub struct Deleter<'a> {
    client: &'a DmeClient,
    name: &'a str,
}

impl<'a> Deleter<'a> {
    /// Prepares the teardown of `name`.
    #[must_use]
    pub const fn new(client: &'a DmeClient, name: &'a str) -> Self {
        Self { client, name }
    }

    /// Deletes the NFS share, the DataTurbo share, then the filesystem.
    ///
    /// Missing resources are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first lookup or deletion failure.
    pub async fn delete(&self) -> Result<(), VolumeError> {
        let share_path = share_path(self.name);

        if let Some(share) = self.client.nfs_share_by_path(&share_path).await? {
            self.client.delete_nfs_share(&share.id).await?;
            tracing::info!(volume = self.name, share_id = %share.id, "deleted NFS share");
        }
        if let Some(share) = self.client.dataturbo_share_by_path(&share_path).await? {
            self.client.delete_dataturbo_share(&share.id).await?;
            tracing::info!(volume = self.name, share_id = %share.id, "deleted DataTurbo share");
        }
        match self.client.filesystem_by_name(self.name).await? {
            Some(filesystem) => {
                self.client.delete_filesystem(&filesystem.id).await?;
                tracing::info!(volume = self.name, filesystem_id = %filesystem.id, "deleted filesystem");
            }
            None => tracing::info!(volume = self.name, "filesystem already absent"),
        }
        Ok(())
    }
}
