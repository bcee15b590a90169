//! Filesystem and share operations.
//!
//! Lookups return `Ok(None)` when nothing matches; mutations submit a task
//! and wait for it.

use super::DmeClient;
use super::error::DmeError;
use super::paths;
use super::transport::Method;
use super::types::{
    CreateFilesystemRequest, DataTurboAdmin, DataTurboShare, DeleteDataTurboShares,
    DeleteFilesystems, DeleteNfsShares, Filesystem, NfsShare, Page, Scoped,
    SharePathQuery, UpdateCapacity,
};

impl DmeClient {
    /// Finds the filesystem named exactly `name`.
    ///
    /// The array filters by substring, so the exact match is picked here.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn filesystem_by_name(&self, name: &str) -> Result<Option<Filesystem>, DmeError> {
        self.find_named(paths::FILESYSTEMS_QUERY, name, |filesystem: &Filesystem| {
            filesystem.name.as_str()
        })
        .await
    }

    /// Creates a filesystem with its share and waits for the task.
    ///
    /// # Errors
    ///
    /// Propagates call and task failures.
    pub async fn create_filesystem(&self, request: &CreateFilesystemRequest) -> Result<(), DmeError> {
        let storage_id = self.storage_id().await?;
        self.wait_task(
            Method::Post,
            paths::FILESYSTEMS_CREATE,
            &Scoped {
                storage_id,
                inner: request,
            },
        )
        .await
    }

    /// Sets the capacity, in sectors, of filesystem `id`.
    ///
    /// # Errors
    ///
    /// Propagates call and task failures.
    pub async fn update_filesystem_capacity(&self, id: &str, capacity: u64) -> Result<(), DmeError> {
        self.wait_task(Method::Put, &paths::filesystem(id), &UpdateCapacity { capacity })
            .await
    }

    /// Deletes filesystem `id`.
    ///
    /// # Errors
    ///
    /// Propagates call and task failures.
    pub async fn delete_filesystem(&self, id: &str) -> Result<(), DmeError> {
        self.wait_task(
            Method::Post,
            paths::FILESYSTEMS_DELETE,
            &DeleteFilesystems {
                file_system_ids: [id],
            },
        )
        .await
    }

    /// Finds the NFS share exported at `share_path`.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn nfs_share_by_path(&self, share_path: &str) -> Result<Option<NfsShare>, DmeError> {
        let storage_id = self.storage_id().await?;
        let page: Page<NfsShare> = self
            .graceful_send(
                Method::Post,
                paths::NFS_SHARES_QUERY,
                &Scoped {
                    storage_id,
                    inner: &SharePathQuery { share_path },
                },
            )
            .await?;
        Ok(page.datas.into_iter().find(|share| share.share_path == share_path))
    }

    /// Deletes NFS share `id`.
    ///
    /// # Errors
    ///
    /// Propagates call and task failures.
    pub async fn delete_nfs_share(&self, id: &str) -> Result<(), DmeError> {
        self.wait_task(
            Method::Post,
            paths::NFS_SHARES_DELETE,
            &DeleteNfsShares { nfs_share_ids: [id] },
        )
        .await
    }

    /// Finds the DataTurbo share exported at `share_path`.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn dataturbo_share_by_path(
        &self,
        share_path: &str,
    ) -> Result<Option<DataTurboShare>, DmeError> {
        let storage_id = self.storage_id().await?;
        let page: Page<DataTurboShare> = self
            .graceful_send(
                Method::Post,
                paths::DATATURBO_SHARES_QUERY,
                &Scoped {
                    storage_id,
                    inner: &SharePathQuery { share_path },
                },
            )
            .await?;
        Ok(page.datas.into_iter().find(|share| share.share_path == share_path))
    }

    /// Deletes DataTurbo share `id`.
    ///
    /// # Errors
    ///
    /// Propagates call and task failures.
    pub async fn delete_dataturbo_share(&self, id: &str) -> Result<(), DmeError> {
        self.wait_task(
            Method::Post,
            paths::DATATURBO_SHARES_DELETE,
            &DeleteDataTurboShares { ids: [id] },
        )
        .await
    }

    /// Finds the DataTurbo administrator named `name`.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn dataturbo_admin_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DataTurboAdmin>, DmeError> {
        self.find_named(paths::DATATURBO_ADMINS_QUERY, name, |admin: &DataTurboAdmin| {
            admin.name.as_str()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::DeviceGates;
    use crate::credentials::{AuthInfo, StaticCredentials};
    use crate::test_support::{ScriptedTransport, fixtures};

    async fn logged_in(transport: &ScriptedTransport) -> DmeClient {
        fixtures::install_login(transport);
        let client = DmeClient::builder("dme-a", ["https://up"])
            .connector(transport.clone())
            .credentials(StaticCredentials::new().with_backend("dme-a", AuthInfo::new("admin", "pw")))
            .device_gates(Arc::new(DeviceGates::new(4)))
            .task_policy(fixtures::fast_task_policy())
            .build()
            .expect("client");
        client.login().await.expect("login");
        client
    }

    #[tokio::test]
    async fn filesystem_lookup_requires_exact_name() {
        let transport = ScriptedTransport::new();
        let client = logged_in(&transport).await;
        transport.respond(
            Method::Post,
            paths::FILESYSTEMS_QUERY,
            200,
            &fixtures::filesystems_body(&[("fs-2", "pvc-10", 2048)]),
        );

        let found = client.filesystem_by_name("pvc-1").await.expect("query");

        assert!(found.is_none());
        let body = transport
            .requests_to(Method::Post, paths::FILESYSTEMS_QUERY)
            .pop()
            .and_then(|request| request.body)
            .expect("query body");
        assert_eq!(body["storage_id"], fixtures::STORAGE_ID);
        assert_eq!(body["name"], "pvc-1");
    }

    #[tokio::test]
    async fn filesystem_lookup_walks_past_a_full_page() {
        let transport = ScriptedTransport::new();
        let client = logged_in(&transport).await;
        let near: Vec<(String, String)> = (0..100)
            .map(|index| (format!("fs-{index}"), format!("pvc-1{index}")))
            .collect();
        let first_page: Vec<(&str, &str, u64)> = near
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str(), 2048))
            .collect();
        transport.respond_sequence(
            Method::Post,
            paths::FILESYSTEMS_QUERY,
            vec![
                (200, fixtures::filesystems_body(&first_page)),
                (200, fixtures::filesystems_body(&[("fs-exact", "pvc-1", 4096)])),
            ],
        );

        let found = client
            .filesystem_by_name("pvc-1")
            .await
            .expect("query")
            .expect("exact match on the second page");

        assert_eq!(found.id, "fs-exact");
        let pages: Vec<_> = transport
            .requests_to(Method::Post, paths::FILESYSTEMS_QUERY)
            .into_iter()
            .filter_map(|request| request.body)
            .map(|body| body["page_no"].clone())
            .collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn short_page_ends_the_lookup() {
        let transport = ScriptedTransport::new();
        let client = logged_in(&transport).await;
        transport.respond(
            Method::Post,
            paths::DATATURBO_ADMINS_QUERY,
            200,
            &fixtures::admins_body(&[("admin-2", "dtadmin-old")]),
        );

        let found = client.dataturbo_admin_by_name("dtadmin").await.expect("query");

        assert!(found.is_none());
        assert_eq!(
            transport
                .requests_to(Method::Post, paths::DATATURBO_ADMINS_QUERY)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn missing_share_list_is_not_found() {
        let transport = ScriptedTransport::new();
        let client = logged_in(&transport).await;
        transport.respond(Method::Post, paths::NFS_SHARES_QUERY, 200, "{}");

        assert!(client.nfs_share_by_path("/pvc-1/").await.expect("query").is_none());
    }

    #[tokio::test]
    async fn delete_without_task_id_is_rejected() {
        let transport = ScriptedTransport::new();
        let client = logged_in(&transport).await;
        transport.respond(Method::Post, paths::NFS_SHARES_DELETE, 200, r#"{"task_id":""}"#);

        let err = client.delete_nfs_share("share-1").await.expect_err("empty task");

        assert!(matches!(err, DmeError::EmptyTask { .. }));
    }

    #[tokio::test]
    async fn capacity_update_waits_for_the_task() {
        let transport = ScriptedTransport::new();
        let client = logged_in(&transport).await;
        fixtures::install_task(&transport, Method::Put, &paths::filesystem("fs-1"), "task-9", &[2, 3]);

        client
            .update_filesystem_capacity("fs-1", 4096)
            .await
            .expect("update");

        let update = transport
            .requests_to(Method::Put, &paths::filesystem("fs-1"))
            .pop()
            .and_then(|request| request.body)
            .expect("update body");
        assert_eq!(update["capacity"], 4096);
        assert_eq!(transport.requests_to(Method::Get, &paths::task("task-9")).len(), 2);
        assert_eq!(client.task_policy(), &fixtures::fast_task_policy());
    }
}
