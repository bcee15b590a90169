//! Builders for clients wired to a scripted transport.

use std::sync::Arc;

use dme_aseries::client::DeviceGates;
use dme_aseries::test_support::{RecordingStatusSink, ScriptedTransport, fixtures};
use dme_aseries::{AuthInfo, DmeClient, StaticCredentials, VolumeEngine};

pub const BACKEND_ID: &str = "dme-a";
pub const PRIMARY_URL: &str = "https://dme-1:26335";
pub const SECONDARY_URL: &str = "https://dme-2:26335";

pub fn credentials() -> StaticCredentials {
    StaticCredentials::new().with_backend(BACKEND_ID, AuthInfo::new("admin", "Secret#1"))
}

pub fn client_with(
    transport: &ScriptedTransport,
    urls: &[&str],
    sink: &RecordingStatusSink,
    parallelism: u32,
) -> Arc<DmeClient> {
    Arc::new(
        DmeClient::builder(BACKEND_ID, urls.iter().copied())
            .connector(transport.clone())
            .credentials(credentials())
            .status_sink(sink.clone())
            .parallelism(parallelism)
            .device_gates(Arc::new(DeviceGates::new(8)))
            .task_policy(fixtures::fast_task_policy())
            .build()
            .unwrap_or_else(|err| panic!("scripted client should build: {err}")),
    )
}

pub fn logged_in_transport() -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    fixtures::install_login(&transport);
    transport
}

pub fn engine(transport: &ScriptedTransport) -> VolumeEngine {
    VolumeEngine::new(client_with(
        transport,
        &[PRIMARY_URL],
        &RecordingStatusSink::new(),
        5,
    ))
}
