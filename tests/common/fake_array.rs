//! Stateful stand-in for the array's filesystem and share endpoints.
//!
//! Queries answer from the current inventory and task-producing endpoints
//! mutate it, so multi-step flows observe their own effects.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dme_aseries::client::{HttpRequest, HttpResponse, Method, paths};
use dme_aseries::test_support::{ScriptedTransport, fixtures};
use serde_json::Value;

pub const CREATE_TASK: &str = "task-create";
pub const UPDATE_TASK: &str = "task-update";
pub const DELETE_FS_TASK: &str = "task-delete-fs";
pub const DELETE_NFS_TASK: &str = "task-delete-nfs";
pub const DELETE_DT_TASK: &str = "task-delete-dt";
pub const DATATURBO_ADMIN: &str = "dtadmin";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredFilesystem {
    pub id: String,
    pub name: String,
    pub capacity: u64,
}

/// Plain snapshot of everything the fake array holds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Inventory {
    filesystems: Vec<StoredFilesystem>,
    nfs_shares: Vec<(String, String)>,
    dataturbo_shares: Vec<(String, String)>,
    next_id: usize,
    creation_failure: Option<String>,
    omit_share_on_create: bool,
}

impl Inventory {
    fn allocate(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{}", self.next_id)
    }

    /// Records a filesystem and returns its id.
    pub fn add_filesystem(&mut self, name: &str, capacity: u64) -> String {
        let id = self.allocate("fs");
        self.filesystems.push(StoredFilesystem {
            id: id.clone(),
            name: name.to_owned(),
            capacity,
        });
        id
    }

    /// Makes creations answer with `body` instead of a task.
    pub fn fail_creation_with(&mut self, body: &str) {
        self.creation_failure = Some(body.to_owned());
    }

    pub fn filesystems(&self) -> &[StoredFilesystem] {
        &self.filesystems
    }

    pub fn nfs_share_paths(&self) -> Vec<String> {
        self.nfs_shares.iter().map(|(_, path)| path.clone()).collect()
    }

    pub fn dataturbo_share_paths(&self) -> Vec<String> {
        self.dataturbo_shares
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct FakeArray {
    transport: ScriptedTransport,
    inventory: Arc<Mutex<Inventory>>,
}

fn text<'a>(body: Option<&'a Value>, key: &str) -> &'a str {
    body.and_then(|value| value[key].as_str()).unwrap_or_default()
}

fn first_id(body: Option<&Value>, key: &str) -> String {
    body.and_then(|value| value[key][0].as_str())
        .unwrap_or_default()
        .to_owned()
}

impl FakeArray {
    /// Installs login, lookups, and mutations on `transport`.
    pub fn install(transport: &ScriptedTransport) -> Self {
        Self::install_with(transport, Inventory::default())
    }

    /// Installs the array on `transport`, starting from `inventory`.
    pub fn install_with(transport: &ScriptedTransport, inventory: Inventory) -> Self {
        fixtures::install_login(transport);
        let ids: Vec<String> = inventory
            .filesystems
            .iter()
            .map(|filesystem| filesystem.id.clone())
            .collect();
        let array = Self {
            transport: transport.clone(),
            inventory: Arc::new(Mutex::new(inventory)),
        };
        for id in &ids {
            array.route_update(id);
        }

        transport.respond(Method::Post, paths::POOLS_QUERY, 200, &fixtures::pools_body());
        transport.respond_with(Method::Post, paths::DATATURBO_ADMINS_QUERY, |request| {
            let body = if text(request.body.as_ref(), "name") == DATATURBO_ADMIN {
                fixtures::admins_body(&[("admin-1", DATATURBO_ADMIN)])
            } else {
                fixtures::admins_body(&[])
            };
            HttpResponse::new(200, body)
        });
        for task in [
            CREATE_TASK,
            UPDATE_TASK,
            DELETE_FS_TASK,
            DELETE_NFS_TASK,
            DELETE_DT_TASK,
        ] {
            transport.respond(
                Method::Get,
                &paths::task(task),
                200,
                &fixtures::task_status_body(task, 3, ""),
            );
        }

        array.route(Method::Post, paths::FILESYSTEMS_QUERY, Self::query_filesystems);
        array.route(Method::Post, paths::NFS_SHARES_QUERY, Self::query_nfs_shares);
        array.route(
            Method::Post,
            paths::DATATURBO_SHARES_QUERY,
            Self::query_dataturbo_shares,
        );
        array.route(Method::Post, paths::FILESYSTEMS_CREATE, Self::create);
        array.route(Method::Post, paths::FILESYSTEMS_DELETE, Self::delete_filesystem);
        array.route(Method::Post, paths::NFS_SHARES_DELETE, Self::delete_nfs_share);
        array.route(
            Method::Post,
            paths::DATATURBO_SHARES_DELETE,
            Self::delete_dataturbo_share,
        );
        array
    }

    fn route(&self, method: Method, path: &str, handler: fn(&Self, &HttpRequest) -> HttpResponse) {
        let array = self.clone();
        self.transport
            .respond_with(method, path, move |request| handler(&array, request));
    }

    fn inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies the current inventory.
    pub fn snapshot(&self) -> Inventory {
        self.inventory().clone()
    }

    /// Adds a filesystem and returns its id.
    pub fn add_filesystem(&self, name: &str, capacity: u64) -> String {
        let id = self.inventory().add_filesystem(name, capacity);
        self.route_update(&id);
        id
    }

    fn route_update(&self, id: &str) {
        let array = self.clone();
        let target = id.to_owned();
        self.transport
            .respond_with(Method::Put, &paths::filesystem(id), move |request| {
                let capacity = request
                    .body
                    .as_ref()
                    .and_then(|body| body["capacity"].as_u64())
                    .unwrap_or_default();
                let mut inventory = array.inventory();
                if let Some(filesystem) = inventory
                    .filesystems
                    .iter_mut()
                    .find(|filesystem| filesystem.id == target)
                {
                    filesystem.capacity = capacity;
                }
                HttpResponse::new(200, fixtures::task_body(UPDATE_TASK))
            });
    }

    /// Adds an NFS share exported at `share_path`.
    pub fn add_nfs_share(&self, share_path: &str) {
        let mut inventory = self.inventory();
        let id = inventory.allocate("nfs");
        inventory.nfs_shares.push((id, share_path.to_owned()));
    }

    /// Adds a DataTurbo share exported at `share_path`.
    pub fn add_dataturbo_share(&self, share_path: &str) {
        let mut inventory = self.inventory();
        let id = inventory.allocate("dt");
        inventory.dataturbo_shares.push((id, share_path.to_owned()));
    }

    /// Makes the next creations answer with `body` instead of a task.
    pub fn fail_creation_with(&self, body: &str) {
        self.inventory().fail_creation_with(body);
    }

    /// Makes creations produce the filesystem but not its share.
    pub fn omit_share_on_create(&self) {
        self.inventory().omit_share_on_create = true;
    }

    pub fn filesystems(&self) -> Vec<StoredFilesystem> {
        self.inventory().filesystems().to_vec()
    }

    pub fn nfs_share_paths(&self) -> Vec<String> {
        self.inventory().nfs_share_paths()
    }

    pub fn dataturbo_share_paths(&self) -> Vec<String> {
        self.inventory().dataturbo_share_paths()
    }

    fn query_filesystems(&self, request: &HttpRequest) -> HttpResponse {
        let name = text(request.body.as_ref(), "name");
        let inventory = self.inventory();
        // The array matches names by substring.
        let matches: Vec<(&str, &str, u64)> = inventory
            .filesystems
            .iter()
            .filter(|filesystem| filesystem.name.contains(name))
            .map(|filesystem| {
                (
                    filesystem.id.as_str(),
                    filesystem.name.as_str(),
                    filesystem.capacity,
                )
            })
            .collect();
        HttpResponse::new(200, fixtures::filesystems_body(&matches))
    }

    fn query_nfs_shares(&self, request: &HttpRequest) -> HttpResponse {
        let path = text(request.body.as_ref(), "share_path");
        let inventory = self.inventory();
        let matches: Vec<(&str, &str)> = inventory
            .nfs_shares
            .iter()
            .filter(|(_, share_path)| share_path == path)
            .map(|(id, share_path)| (id.as_str(), share_path.as_str()))
            .collect();
        HttpResponse::new(200, fixtures::nfs_shares_body(&matches))
    }

    fn query_dataturbo_shares(&self, request: &HttpRequest) -> HttpResponse {
        let path = text(request.body.as_ref(), "share_path");
        let inventory = self.inventory();
        let matches: Vec<(&str, &str)> = inventory
            .dataturbo_shares
            .iter()
            .filter(|(_, share_path)| share_path == path)
            .map(|(id, share_path)| (id.as_str(), share_path.as_str()))
            .collect();
        HttpResponse::new(200, fixtures::dataturbo_shares_body(&matches))
    }

    fn create(&self, request: &HttpRequest) -> HttpResponse {
        let body = request.body.as_ref();
        let (failure, omit_share) = {
            let inventory = self.inventory();
            (
                inventory.creation_failure.clone(),
                inventory.omit_share_on_create,
            )
        };
        if let Some(failure) = failure {
            return HttpResponse::new(200, failure);
        }

        let spec = body.map(|value| &value["filesystem_specs"][0]);
        let name = spec
            .and_then(|spec| spec["name"].as_str())
            .unwrap_or_default();
        let capacity = spec
            .and_then(|spec| spec["capacity"].as_u64())
            .unwrap_or_default();
        self.add_filesystem(name, capacity);

        if !omit_share {
            let nfs_path = body
                .and_then(|value| value["create_nfs_share_param"]["share_path"].as_str());
            let dataturbo_path = body
                .and_then(|value| value["create_dataturbo_share_param"]["share_path"].as_str());
            if let Some(path) = nfs_path {
                self.add_nfs_share(path);
            }
            if let Some(path) = dataturbo_path {
                self.add_dataturbo_share(path);
            }
        }
        HttpResponse::new(200, fixtures::task_body(CREATE_TASK))
    }

    fn delete_filesystem(&self, request: &HttpRequest) -> HttpResponse {
        let id = first_id(request.body.as_ref(), "file_system_ids");
        self.inventory()
            .filesystems
            .retain(|filesystem| filesystem.id != id);
        HttpResponse::new(200, fixtures::task_body(DELETE_FS_TASK))
    }

    fn delete_nfs_share(&self, request: &HttpRequest) -> HttpResponse {
        let id = first_id(request.body.as_ref(), "nfs_share_ids");
        self.inventory().nfs_shares.retain(|(share, _)| *share != id);
        HttpResponse::new(200, fixtures::task_body(DELETE_NFS_TASK))
    }

    fn delete_dataturbo_share(&self, request: &HttpRequest) -> HttpResponse {
        let id = first_id(request.body.as_ref(), "ids");
        self.inventory()
            .dataturbo_shares
            .retain(|(share, _)| *share != id);
        HttpResponse::new(200, fixtures::task_body(DELETE_DT_TASK))
    }
}
