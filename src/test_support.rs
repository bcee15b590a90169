//! Test support utilities shared across unit and integration tests.
//!
//! [`ScriptedTransport`] stands in for the network: routes are matched by
//! method and URL suffix, every request is recorded, and the same value
//! doubles as the [`Connector`] handed to the client builder.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::client::{
    Connector, DmeError, HttpRequest, HttpResponse, Method, Transport, TransportError,
    TransportFuture,
};
use crate::status::BackendStatusSink;

type Handler = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

enum Reply {
    /// Responses served in order; the last one repeats.
    Queue(VecDeque<HttpResponse>),
    Handler(Handler),
}

struct ScriptedRoute {
    method: Method,
    suffix: String,
    reply: Reply,
}

#[derive(Default)]
struct ScriptState {
    routes: Vec<ScriptedRoute>,
    failures: Vec<(String, String)>,
    requests: Vec<HttpRequest>,
    latency: Option<Duration>,
    connects: usize,
    in_flight: usize,
    max_in_flight: usize,
}

enum Scripted {
    Ready(Result<HttpResponse, TransportError>),
    Deferred(Handler),
}

impl ScriptState {
    fn reply_for(&mut self, request: &HttpRequest) -> Scripted {
        if let Some((_, message)) = self
            .failures
            .iter()
            .find(|(prefix, _)| request.url.starts_with(prefix.as_str()))
        {
            return Scripted::Ready(Err(TransportError::new(message)));
        }

        let route = self
            .routes
            .iter_mut()
            .filter(|route| route.method == request.method && request.url.ends_with(&route.suffix))
            .max_by_key(|route| route.suffix.len());
        let Some(route) = route else {
            return Scripted::Ready(Ok(HttpResponse::new(
                404,
                format!("no scripted route for {} {}", request.method, request.url),
            )));
        };
        match &mut route.reply {
            Reply::Handler(handler) => Scripted::Deferred(Arc::clone(handler)),
            Reply::Queue(queue) => {
                let next = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                Scripted::Ready(Ok(next.unwrap_or_else(|| HttpResponse::new(500, ""))))
            }
        }
    }
}

/// Route-scripted fake transport and connector.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<StdMutex<ScriptState>>,
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ScriptedTransport")
            .field("routes", &state.routes.len())
            .field("requests", &state.requests.len())
            .finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    /// Creates a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StdMutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install(&self, method: Method, suffix: &str, reply: Reply) {
        let mut state = self.lock();
        state
            .routes
            .retain(|route| !(route.method == method && route.suffix == suffix));
        state.routes.push(ScriptedRoute {
            method,
            suffix: suffix.to_owned(),
            reply,
        });
    }

    /// Answers every `method` request ending in `suffix` with one response.
    pub fn respond(&self, method: Method, suffix: &str, status: u16, body: &str) {
        self.respond_sequence(method, suffix, vec![(status, body.to_owned())]);
    }

    /// Answers with `responses` in order, repeating the last one.
    pub fn respond_sequence(&self, method: Method, suffix: &str, responses: Vec<(u16, String)>) {
        let queue = responses
            .into_iter()
            .map(|(status, body)| HttpResponse::new(status, body))
            .collect();
        self.install(method, suffix, Reply::Queue(queue));
    }

    /// Answers by calling `handler` with each matching request.
    pub fn respond_with<F>(&self, method: Method, suffix: &str, handler: F)
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.install(method, suffix, Reply::Handler(Arc::new(handler)));
    }

    /// Fails every request whose URL starts with `prefix` at the transport level.
    pub fn fail_prefix(&self, prefix: &str, message: &str) {
        self.lock()
            .failures
            .push((prefix.to_owned(), message.to_owned()));
    }

    /// Removes all transport-level failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Delays every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Returns every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Returns the requests sent with `method` to a URL ending in `suffix`.
    #[must_use]
    pub fn requests_to(&self, method: Method, suffix: &str) -> Vec<HttpRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method && request.url.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Forgets the recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Returns how many transports were handed out.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Returns the highest number of requests in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let (scripted, latency) = {
                let mut state = self.lock();
                state.requests.push(request.clone());
                state.in_flight += 1;
                state.max_in_flight = state.max_in_flight.max(state.in_flight);
                (state.reply_for(&request), state.latency)
            };
            // Handlers run outside the lock so they may inspect the script.
            let outcome = match scripted {
                Scripted::Ready(outcome) => outcome,
                Scripted::Deferred(handler) => Ok(handler(&request)),
            };
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            self.lock().in_flight -= 1;
            outcome
        })
    }
}

impl Connector for ScriptedTransport {
    fn connect(&self) -> Result<Arc<dyn Transport>, DmeError> {
        self.lock().connects += 1;
        Ok(Arc::new(self.clone()))
    }
}

/// Status sink that records every transition.
#[derive(Clone, Debug, Default)]
pub struct RecordingStatusSink {
    events: Arc<StdMutex<Vec<(String, bool)>>>,
}

impl RecordingStatusSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded `(backend_id, online)` pairs.
    #[must_use]
    pub fn events(&self) -> Vec<(String, bool)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BackendStatusSink for RecordingStatusSink {
    fn set_online_status(&self, backend_id: &str, online: bool) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((backend_id.to_owned(), online));
    }
}

/// Canned DME bodies and route installers.
pub mod fixtures {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::ScriptedTransport;
    use crate::client::{HttpResponse, Method, TaskPolicy, paths};

    /// Storage id reported for the scripted array.
    pub const STORAGE_ID: &str = "storage-1";
    /// Serial number reported for the scripted array.
    pub const DEVICE_SN: &str = "2102354JHE10M3000004";
    /// Name of the scripted pool.
    pub const POOL_NAME: &str = "pool-a";

    /// Task policy with millisecond intervals.
    #[must_use]
    pub const fn fast_task_policy() -> TaskPolicy {
        TaskPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            timeout: Duration::from_secs(5),
        }
    }

    /// Scripts login and logout; tokens are `token-1`, `token-2`, and so on.
    pub fn install_sessions(transport: &ScriptedTransport) {
        let issued = Arc::new(AtomicUsize::new(0));
        transport.respond_with(Method::Put, paths::SESSIONS, move |_| {
            let token = issued.fetch_add(1, Ordering::SeqCst) + 1;
            HttpResponse::new(200, json!({ "accessSession": format!("token-{token}") }).to_string())
        });
        transport.respond(Method::Delete, paths::SESSIONS, 200, "");
    }

    /// Scripts sessions plus the identity lookups that follow a login.
    pub fn install_login(transport: &ScriptedTransport) {
        install_sessions(transport);
        transport.respond(Method::Get, paths::SYSTEM_INFO, 200, &system_info_body());
        transport.respond(Method::Get, paths::STORAGES, 200, &storages_body());
    }

    /// System information naming [`DEVICE_SN`].
    #[must_use]
    pub fn system_info_body() -> String {
        json!({ "sn": DEVICE_SN, "name": "array-1", "version": "6.1.6" }).to_string()
    }

    /// Storage list containing [`STORAGE_ID`] and an unrelated array.
    #[must_use]
    pub fn storages_body() -> String {
        json!({
            "total": 2,
            "datas": [
                { "id": "storage-0", "sn": "OTHER-SN", "name": "array-0" },
                { "id": STORAGE_ID, "sn": DEVICE_SN, "name": "array-1" }
            ]
        })
        .to_string()
    }

    /// Filesystem page from `(id, name, capacity_sectors)` entries.
    #[must_use]
    pub fn filesystems_body(entries: &[(&str, &str, u64)]) -> String {
        let datas: Vec<_> = entries
            .iter()
            .map(|(id, name, capacity)| {
                json!({
                    "id": id,
                    "name": name,
                    "capacity": capacity,
                    "pool_name": POOL_NAME,
                    "health_status": "normal",
                    "running_status": "online"
                })
            })
            .collect();
        json!({ "total": datas.len(), "datas": datas }).to_string()
    }

    /// Pool page holding [`POOL_NAME`].
    #[must_use]
    pub fn pools_body() -> String {
        json!({
            "total": 1,
            "datas": [{
                "id": "pool-uuid-1",
                "raw_id": "0",
                "name": POOL_NAME,
                "total_capacity": 1_048_576,
                "used_capacity": 0,
                "free_capacity": 1_048_576
            }]
        })
        .to_string()
    }

    /// NFS share page from `(id, share_path)` entries.
    #[must_use]
    pub fn nfs_shares_body(entries: &[(&str, &str)]) -> String {
        let shares: Vec<_> = entries
            .iter()
            .map(|(id, path)| json!({ "id": id, "share_path": path }))
            .collect();
        json!({ "total": shares.len(), "nfs_share_info_list": shares }).to_string()
    }

    /// DataTurbo share page from `(id, share_path)` entries.
    #[must_use]
    pub fn dataturbo_shares_body(entries: &[(&str, &str)]) -> String {
        let shares: Vec<_> = entries
            .iter()
            .map(|(id, path)| json!({ "id": id, "share_path": path }))
            .collect();
        json!({ "total": shares.len(), "dataturbo_share_info_list": shares }).to_string()
    }

    /// DataTurbo administrator page from `(id, name)` entries.
    #[must_use]
    pub fn admins_body(entries: &[(&str, &str)]) -> String {
        let admins: Vec<_> = entries
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        json!({ "total": admins.len(), "datas": admins }).to_string()
    }

    /// Task submission answer.
    #[must_use]
    pub fn task_body(task_id: &str) -> String {
        json!({ "task_id": task_id }).to_string()
    }

    /// Task status array with one entry.
    #[must_use]
    pub fn task_status_body(task_id: &str, status: u32, detail: &str) -> String {
        json!([{ "id": task_id, "status": status, "detail": detail }]).to_string()
    }

    /// Scripts a task-producing endpoint and the statuses its task reports.
    pub fn install_task(
        transport: &ScriptedTransport,
        method: Method,
        path: &str,
        task_id: &str,
        statuses: &[u32],
    ) {
        transport.respond(method, path, 200, &task_body(task_id));
        transport.respond_sequence(
            Method::Get,
            &paths::task(task_id),
            statuses
                .iter()
                .map(|status| (200, task_status_body(task_id, *status, "")))
                .collect(),
        );
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Holds [`ENV_LOCK`] and restores the touched variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets `set` and removes `unset` while holding the environment lock.
    pub async fn scoped(set: &[(&str, &str)], unset: &[&str]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                set.iter()
                    .map(|(key, _)| *key)
                    .chain(unset.iter().copied())
                    .all(|key| seen.insert(key))
            },
            "environment keys must be unique"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(set.len() + unset.len());
        for (key, value) in set {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::set_var(key, value) };
        }
        for key in unset {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::remove_var(key) };
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in self.previous.drain(..).rev() {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(value) => env::set_var(&key, value),
                    None => env::remove_var(&key),
                }
            }
        }
    }
}
