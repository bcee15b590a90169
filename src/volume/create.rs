//! Volume creation as a two-step transaction.

use std::sync::{Arc, OnceLock};

use super::transaction::{Step, StepFuture, Transaction};
use super::{
    CreateVolumeParams, Deleter, Protocol, Volume, VolumeError, bytes_to_sectors, share_path,
};
use crate::client::{
    AllocationType, CreateFilesystemRequest, DataTurboShareParam, DataTurboUserAddition,
    DmeClient, FilesystemSpec, NfsClientAddition, NfsShareParam, Pool, Tuning,
};

const READ_WRITE: &str = "read_and_write";
const SYNCHRONOUS_WRITES: &str = "synchronization";

/// State shared by the creation steps.
struct CreateContext {
    client: Arc<DmeClient>,
    params: CreateVolumeParams,
    share_path: String,
    pool: OnceLock<Pool>,
    users: OnceLock<Vec<String>>,
    filesystem_id: OnceLock<String>,
}

/// Creates a filesystem and its protocol share.
pub struct Creator {
    context: CreateContext,
}

impl Creator {
    /// Prepares a creation of `params` through `client`.
    #[must_use]
    pub fn new(client: Arc<DmeClient>, params: CreateVolumeParams) -> Self {
        let share_path = share_path(&params.name);
        Self {
            context: CreateContext {
                client,
                params,
                share_path,
                pool: OnceLock::new(),
                users: OnceLock::new(),
                filesystem_id: OnceLock::new(),
            },
        }
    }

    /// Runs the creation.
    ///
    /// Quota-control refusals are returned as they are; every other failure
    /// after preparation tears down whatever exists under the volume name.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    pub async fn create(self) -> Result<Volume, VolumeError> {
        let transaction = Transaction::<CreateContext, VolumeError>::new()
            .step(Step::new("prepare", prepare).with_compensation(teardown))
            .step(Step::new("provision", provision));
        transaction
            .commit(&self.context, VolumeError::is_quota_control)
            .await?;

        let context = self.context;
        let id = context
            .filesystem_id
            .get()
            .cloned()
            .ok_or_else(|| VolumeError::NotVisibleAfterCreate {
                name: context.params.name.clone(),
            })?;
        tracing::info!(volume = %context.params.name, filesystem_id = %id, "volume ready");
        Ok(Volume {
            name: context.params.name,
            size: context.params.size,
            id,
        })
    }
}

fn prepare(context: &CreateContext) -> StepFuture<'_, VolumeError> {
    Box::pin(context.prepare())
}

fn provision(context: &CreateContext) -> StepFuture<'_, VolumeError> {
    Box::pin(context.provision())
}

fn teardown(context: &CreateContext) -> StepFuture<'_, VolumeError> {
    Box::pin(async move {
        tracing::warn!(volume = %context.params.name, "rolling back volume creation");
        Deleter::new(&context.client, &context.params.name)
            .delete()
            .await
    })
}

fn stored<T>(cell: &OnceLock<T>, value: T, what: &str) -> Result<(), VolumeError> {
    cell.set(value)
        .map_err(|_| VolumeError::Validation(format!("{what} resolved twice for one creation")))
}

impl CreateContext {
    async fn prepare(&self) -> Result<(), VolumeError> {
        match self.params.protocol {
            Protocol::Nfs => {
                if self.nfs_clients().next().is_none() {
                    return Err(VolumeError::Validation(String::from(
                        "NFS volumes need at least one authorized client",
                    )));
                }
            }
            Protocol::DataTurbo => {
                let users = self.resolve_users().await?;
                stored(&self.users, users, "DataTurbo users")?;
            }
        }

        let pool = self
            .client
            .pool_by_name(&self.params.pool_name)
            .await?
            .ok_or_else(|| VolumeError::PoolNotFound {
                pool: self.params.pool_name.clone(),
            })?;
        stored(&self.pool, pool, "pool")
    }

    fn nfs_clients(&self) -> impl Iterator<Item = &str> {
        self.params
            .authorized_clients
            .iter()
            .map(|client| client.trim())
            .filter(|client| !client.is_empty())
    }

    async fn resolve_users(&self) -> Result<Vec<String>, VolumeError> {
        let mut resolved = Vec::new();
        for user in &self.params.authorized_users {
            let user = user.trim();
            if user.is_empty() {
                continue;
            }
            match self.client.dataturbo_admin_by_name(user).await? {
                Some(admin) => resolved.push(admin.name),
                None => {
                    tracing::warn!(volume = %self.params.name, user, "DataTurbo user not found, skipping");
                }
            }
        }
        if resolved.is_empty() {
            return Err(VolumeError::NoAdministrators {
                volume: self.params.name.clone(),
            });
        }
        Ok(resolved)
    }

    async fn provision(&self) -> Result<(), VolumeError> {
        let name = &self.params.name;
        if let Some(filesystem) = self.client.filesystem_by_name(name).await? {
            if self.share_exists().await? {
                tracing::info!(volume = %name, filesystem_id = %filesystem.id, "volume already provisioned");
                return stored(&self.filesystem_id, filesystem.id, "filesystem id");
            }
            return Err(VolumeError::PartiallyProvisioned {
                name: name.clone(),
                protocol: self.params.protocol,
            });
        }

        self.remove_stale_shares().await?;
        let request = self.creation_request()?;
        self.client.create_filesystem(&request).await?;

        let created = self
            .client
            .filesystem_by_name(name)
            .await?
            .ok_or_else(|| VolumeError::NotVisibleAfterCreate { name: name.clone() })?;
        if !self.share_exists().await? {
            return Err(VolumeError::NotVisibleAfterCreate { name: name.clone() });
        }
        stored(&self.filesystem_id, created.id, "filesystem id")
    }

    async fn share_exists(&self) -> Result<bool, VolumeError> {
        let exists = match self.params.protocol {
            Protocol::Nfs => self
                .client
                .nfs_share_by_path(&self.share_path)
                .await?
                .is_some(),
            Protocol::DataTurbo => self
                .client
                .dataturbo_share_by_path(&self.share_path)
                .await?
                .is_some(),
        };
        Ok(exists)
    }

    async fn remove_stale_shares(&self) -> Result<(), VolumeError> {
        if let Some(share) = self.client.nfs_share_by_path(&self.share_path).await? {
            tracing::info!(volume = %self.params.name, share_id = %share.id, "removing stale NFS share");
            self.client.delete_nfs_share(&share.id).await?;
        }
        if let Some(share) = self.client.dataturbo_share_by_path(&self.share_path).await? {
            tracing::info!(volume = %self.params.name, share_id = %share.id, "removing stale DataTurbo share");
            self.client.delete_dataturbo_share(&share.id).await?;
        }
        Ok(())
    }

    fn creation_request(&self) -> Result<CreateFilesystemRequest, VolumeError> {
        let pool = self
            .pool
            .get()
            .ok_or_else(|| VolumeError::PoolNotFound {
                pool: self.params.pool_name.clone(),
            })?;
        let tuning = self
            .params
            .allocation_type
            .as_deref()
            .and_then(AllocationType::parse)
            .map(|allocation_type| Tuning { allocation_type });

        let mut request = CreateFilesystemRequest {
            pool_raw_id: pool.raw_id.clone(),
            filesystem_specs: vec![FilesystemSpec {
                name: self.params.name.clone(),
                capacity: bytes_to_sectors(self.params.size),
                count: 1,
                description: self.params.description.clone(),
            }],
            create_nfs_share_param: None,
            create_dataturbo_share_param: None,
            tuning,
        };
        match self.params.protocol {
            Protocol::Nfs => {
                request.create_nfs_share_param = Some(NfsShareParam {
                    share_path: self.share_path.clone(),
                    nfs_share_client_addition: self
                        .nfs_clients()
                        .map(|client| self.nfs_client(client))
                        .collect(),
                });
            }
            Protocol::DataTurbo => {
                let users = self.users.get().cloned().unwrap_or_default();
                request.create_dataturbo_share_param = Some(DataTurboShareParam {
                    share_path: self.share_path.clone(),
                    dataturbo_share_user_addition: users
                        .into_iter()
                        .map(|name| DataTurboUserAddition {
                            name,
                            permission: String::from(READ_WRITE),
                        })
                        .collect(),
                });
            }
        }
        Ok(request)
    }

    fn nfs_client(&self, name: &str) -> NfsClientAddition {
        let squash = |enabled: bool, option: &str| {
            if enabled {
                option.to_owned()
            } else {
                format!("no_{option}")
            }
        };
        NfsClientAddition {
            name: name.to_owned(),
            permission: String::from(READ_WRITE),
            write_mode: String::from(SYNCHRONOUS_WRITES),
            permission_constraint: squash(self.params.all_squash, "all_squash"),
            root_permission_constraint: squash(self.params.root_squash, "root_squash"),
        }
    }
}
