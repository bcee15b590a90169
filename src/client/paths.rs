//! REST endpoint paths relative to the pinned base URL.

/// Session login (`PUT`) and logout (`DELETE`).
pub const SESSIONS: &str = "/rest/plat/smapp/v1/sessions";
/// System information of the managed array.
pub const SYSTEM_INFO: &str = "/rest/storagemgmt/v1/system-info";
/// Storage devices registered in DME.
pub const STORAGES: &str = "/rest/storagemgmt/v1/storages";
/// Storage pool query.
pub const POOLS_QUERY: &str = "/rest/storagemgmt/v1/storagepools/query";
/// Task status collection; append `/{task_id}`.
pub const TASKS: &str = "/rest/taskmgmt/v1/tasks";

/// Filesystem collection; append `/{id}` to update one.
pub const FILESYSTEMS: &str = "/rest/fileservice/v1/filesystems";
/// Filesystem query.
pub const FILESYSTEMS_QUERY: &str = "/rest/fileservice/v1/filesystems/query";
/// Filesystem creation together with its share.
pub const FILESYSTEMS_CREATE: &str = "/rest/fileservice/v1/filesystems/customize-filesystems";
/// Filesystem deletion.
pub const FILESYSTEMS_DELETE: &str = "/rest/fileservice/v1/filesystems/delete";

/// NFS share query.
pub const NFS_SHARES_QUERY: &str = "/rest/fileservice/v1/nfs-shares/query";
/// NFS share deletion.
pub const NFS_SHARES_DELETE: &str = "/rest/fileservice/v1/nfs-shares/delete";
/// DataTurbo share query.
pub const DATATURBO_SHARES_QUERY: &str = "/rest/fileservice/v1/dataturbo-shares/query";
/// DataTurbo share deletion.
pub const DATATURBO_SHARES_DELETE: &str = "/rest/fileservice/v1/dataturbo-shares/delete";
/// DataTurbo administrator query.
pub const DATATURBO_ADMINS_QUERY: &str = "/rest/fileservice/v1/dataturbo-admins/query";

/// Status path of one task.
#[must_use]
pub fn task(task_id: &str) -> String {
    format!("{TASKS}/{task_id}")
}

/// Path of one filesystem.
#[must_use]
pub fn filesystem(id: &str) -> String {
    format!("{FILESYSTEMS}/{id}")
}
