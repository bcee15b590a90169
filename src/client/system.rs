//! Array-level lookups: system information, storages, and pools.

use serde::de::DeserializeOwned;

use super::DmeClient;
use super::error::DmeError;
use super::paths;
use super::transport::Method;
use super::types::{
    NAME_PAGE_LIMIT, NAME_PAGE_SIZE, NameQuery, Page, Pool, Scoped, Storage, SystemInfo,
};

impl DmeClient {
    /// Returns the system information of the managed array.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn system_info(&self) -> Result<SystemInfo, DmeError> {
        self.graceful_get(paths::SYSTEM_INFO).await
    }

    /// Lists the storage devices registered in DME.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn storages(&self) -> Result<Vec<Storage>, DmeError> {
        let page: Page<Storage> = self.graceful_get(paths::STORAGES).await?;
        Ok(page.datas)
    }

    /// Finds the pool named exactly `name` on this backend's storage.
    ///
    /// # Errors
    ///
    /// Propagates call failures.
    pub async fn pool_by_name(&self, name: &str) -> Result<Option<Pool>, DmeError> {
        self.find_named(paths::POOLS_QUERY, name, |pool: &Pool| pool.name.as_str())
            .await
    }

    /// Walks the pages of a substring name query until an exact match.
    ///
    /// Stops at the first short page, which the array sends once the
    /// matches are exhausted.
    pub(crate) async fn find_named<T>(
        &self,
        path: &str,
        name: &str,
        name_of: fn(&T) -> &str,
    ) -> Result<Option<T>, DmeError>
    where
        T: DeserializeOwned,
    {
        let storage_id = self.storage_id().await?;
        for page_no in 1..=NAME_PAGE_LIMIT {
            let page: Page<T> = self
                .graceful_send(
                    Method::Post,
                    path,
                    &Scoped {
                        storage_id,
                        inner: &NameQuery::page(name, page_no),
                    },
                )
                .await?;
            let fetched = page.datas.len();
            if let Some(found) = page.datas.into_iter().find(|entry| name_of(entry) == name) {
                return Ok(Some(found));
            }
            if fetched < NAME_PAGE_SIZE {
                return Ok(None);
            }
        }
        tracing::warn!(backend_id = %self.backend_id, path, name, "name lookup hit the page limit");
        Ok(None)
    }
}
