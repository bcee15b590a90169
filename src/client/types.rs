//! Wire shapes exchanged with the DME REST API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Page envelope returned by list and query endpoints.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(
        default = "Vec::new",
        alias = "nfs_share_info_list",
        alias = "dataturbo_share_info_list"
    )]
    pub(crate) datas: Vec<T>,
}

/// Response body of every task-producing endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct TaskResponse {
    #[serde(default)]
    pub(crate) task_id: String,
}

/// Wraps a request body with the storage id every scoped endpoint expects.
#[derive(Serialize)]
pub(crate) struct Scoped<'a, T: Serialize> {
    pub(crate) storage_id: &'a str,
    #[serde(flatten)]
    pub(crate) inner: &'a T,
}

/// Entries requested per page of a name lookup.
pub(crate) const NAME_PAGE_SIZE: usize = 100;

/// Pages walked before a name lookup gives up.
pub(crate) const NAME_PAGE_LIMIT: u32 = 100;

/// One page of a substring name lookup.
#[derive(Serialize)]
pub(crate) struct NameQuery<'a> {
    pub(crate) name: &'a str,
    pub(crate) page_no: u32,
    pub(crate) page_size: usize,
}

impl<'a> NameQuery<'a> {
    pub(crate) const fn page(name: &'a str, page_no: u32) -> Self {
        Self {
            name,
            page_no,
            page_size: NAME_PAGE_SIZE,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct SharePathQuery<'a> {
    pub(crate) share_path: &'a str,
}

#[derive(Serialize)]
pub(crate) struct DeleteFilesystems<'a> {
    pub(crate) file_system_ids: [&'a str; 1],
}

#[derive(Serialize)]
pub(crate) struct DeleteNfsShares<'a> {
    pub(crate) nfs_share_ids: [&'a str; 1],
}

#[derive(Serialize)]
pub(crate) struct DeleteDataTurboShares<'a> {
    pub(crate) ids: [&'a str; 1],
}

#[derive(Serialize)]
pub(crate) struct UpdateCapacity {
    pub(crate) capacity: u64,
}

/// Filesystem as reported by the array.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Filesystem {
    /// Array-assigned identifier.
    pub id: String,
    /// Filesystem name; equals the volume name.
    pub name: String,
    /// Capacity in 512-byte sectors.
    #[serde(default)]
    pub capacity: u64,
    /// Name of the owning storage pool.
    #[serde(default)]
    pub pool_name: String,
    /// Health status reported by the array.
    #[serde(default)]
    pub health_status: String,
    /// Running status reported by the array.
    #[serde(default)]
    pub running_status: String,
}

/// Storage pool from which filesystem capacity is drawn.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Pool {
    /// DME identifier.
    pub id: String,
    /// Identifier of the pool on the array itself.
    pub raw_id: String,
    /// Pool name.
    pub name: String,
    /// Total capacity in sectors.
    #[serde(default)]
    pub total_capacity: u64,
    /// Used capacity in sectors.
    #[serde(default)]
    pub used_capacity: u64,
    /// Free capacity in sectors.
    #[serde(default)]
    pub free_capacity: u64,
}

/// NFS export of a filesystem.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct NfsShare {
    /// Share identifier.
    pub id: String,
    /// Export path, `/<name>/`.
    pub share_path: String,
}

/// DataTurbo export of a filesystem.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct DataTurboShare {
    /// Share identifier.
    pub id: String,
    /// Export path, `/<name>/`.
    pub share_path: String,
}

/// DataTurbo administrator account known to the array.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct DataTurboAdmin {
    /// Administrator identifier.
    pub id: String,
    /// Administrator user name.
    pub name: String,
}

/// System information of the array behind the management endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SystemInfo {
    /// Device serial number.
    pub sn: String,
    /// Device name.
    #[serde(default)]
    pub name: String,
    /// Software version.
    #[serde(default)]
    pub version: String,
}

/// Storage device registered in DME.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Storage {
    /// DME storage identifier.
    pub id: String,
    /// Device serial number.
    pub sn: String,
    /// Device name.
    #[serde(default)]
    pub name: String,
}

/// Status entry for a long-running task.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct TaskInfo {
    /// Task identifier.
    pub id: String,
    /// Parent task identifier for sub-tasks.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Raw status code, see [`TaskStatus`].
    pub status: u32,
    /// Detail text supplied by the array.
    #[serde(default)]
    pub detail: Option<String>,
}

/// Decoded task status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskStatus {
    /// Task accepted but not started.
    Init,
    /// Task in progress.
    Running,
    /// Task finished successfully.
    Success,
    /// Task terminated in a failure state.
    Terminal(TaskOutcome),
    /// Status code outside the documented range.
    Unknown(u32),
}

impl TaskStatus {
    /// Maps the array's numeric status code.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Init,
            2 => Self::Running,
            3 => Self::Success,
            4 => Self::Terminal(TaskOutcome::PartFailed),
            5 => Self::Terminal(TaskOutcome::Failed),
            6 => Self::Terminal(TaskOutcome::TimedOut),
            other => Self::Unknown(other),
        }
    }
}

/// Terminal failure kinds reported by the array for a task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskOutcome {
    /// Some sub-tasks failed.
    PartFailed,
    /// The task failed.
    Failed,
    /// The array gave up on the task.
    TimedOut,
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PartFailed => "partially failed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out on the array",
        };
        f.write_str(text)
    }
}

/// Allocation policy accepted in the creation tuning block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationType {
    /// Thin provisioning.
    Thin,
    /// Thick provisioning.
    Thick,
}

impl AllocationType {
    /// Parses a user-supplied value, returning `None` for anything unknown.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "thin" => Some(Self::Thin),
            "thick" => Some(Self::Thick),
            _ => None,
        }
    }
}

/// Payload for `customize-filesystems`.
///
/// The share parameters create the export in the same task as the
/// filesystem, so exactly one of them is set.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateFilesystemRequest {
    /// Array-side id of the target pool.
    pub pool_raw_id: String,
    /// Filesystems to create; always a single entry.
    pub filesystem_specs: Vec<FilesystemSpec>,
    /// NFS export created with the filesystem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_nfs_share_param: Option<NfsShareParam>,
    /// DataTurbo export created with the filesystem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_dataturbo_share_param: Option<DataTurboShareParam>,
    /// Optional tuning block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuning: Option<Tuning>,
}

/// Single filesystem entry of a creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FilesystemSpec {
    /// Filesystem name.
    pub name: String,
    /// Capacity in sectors.
    pub capacity: u64,
    /// Number of filesystems to create with this spec.
    pub count: u32,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// NFS export parameters of a creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NfsShareParam {
    /// Export path.
    pub share_path: String,
    /// Authorised clients.
    pub nfs_share_client_addition: Vec<NfsClientAddition>,
}

/// One authorised NFS client.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct NfsClientAddition {
    /// Host, network, or wildcard.
    pub name: String,
    /// Access permission.
    pub permission: String,
    /// Write mode.
    pub write_mode: String,
    /// `all_squash` or `no_all_squash`.
    pub permission_constraint: String,
    /// `root_squash` or `no_root_squash`.
    pub root_permission_constraint: String,
}

/// DataTurbo export parameters of a creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DataTurboShareParam {
    /// Export path.
    pub share_path: String,
    /// Authorised administrators.
    pub dataturbo_share_user_addition: Vec<DataTurboUserAddition>,
}

/// One authorised DataTurbo administrator.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DataTurboUserAddition {
    /// Administrator name.
    pub name: String,
    /// Access permission.
    pub permission: String,
}

/// Tuning block of a creation request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Tuning {
    /// Allocation policy.
    pub allocation_type: AllocationType,
}
