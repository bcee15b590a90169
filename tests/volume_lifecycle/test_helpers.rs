//! Shared fixtures for volume lifecycle scenarios.
//!
//! Scenario state is plain data: every engine step replays the stored
//! inventory onto a fresh scripted array and keeps the inventory it leaves
//! behind.

use std::future::Future;

use dme_aseries::client::{Method, paths};
use dme_aseries::test_support::ScriptedTransport;
use dme_aseries::{Volume, VolumeEngine, VolumeError};
use rstest::fixture;
use thiserror::Error;
use tokio::runtime::Runtime;

use crate::fake_array::{FakeArray, Inventory};
use crate::scripted_client::engine;

#[derive(Clone, Debug, Default)]
pub struct LifecycleContext {
    pub inventory: Inventory,
    pub creation_requests: usize,
    pub outcome: Option<LifecycleOutcome>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LifecycleFailure {
    pub kind: String,
    pub message: String,
}

#[derive(Clone, Debug)]
pub enum LifecycleOutcome {
    Volume(Volume),
    Done,
    Failed(LifecycleFailure),
}

impl LifecycleOutcome {
    pub fn from_result<T>(result: Result<T, VolumeError>, on_success: impl FnOnce(T) -> Self) -> Self {
        match result {
            Ok(value) => on_success(value),
            Err(err) => Self::Failed(LifecycleFailure {
                kind: failure_kind(&err).to_owned(),
                message: err.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("runtime setup failed: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[fixture]
pub fn lifecycle() -> LifecycleContext {
    LifecycleContext::default()
}

impl LifecycleContext {
    /// Runs `operation` against an array holding the stored inventory.
    pub fn drive<T, F, Fut>(
        self,
        operation: F,
        on_success: impl FnOnce(T) -> LifecycleOutcome,
    ) -> Result<Self, StepError>
    where
        F: FnOnce(VolumeEngine) -> Fut,
        Fut: Future<Output = Result<T, VolumeError>>,
    {
        let transport = ScriptedTransport::new();
        let array = FakeArray::install_with(&transport, self.inventory);
        let result = block_on(operation(engine(&transport)))?;
        let sent = transport
            .requests_to(Method::Post, paths::FILESYSTEMS_CREATE)
            .len();
        Ok(Self {
            inventory: array.snapshot(),
            creation_requests: self.creation_requests + sent,
            outcome: Some(LifecycleOutcome::from_result(result, on_success)),
        })
    }
}

/// Drives one engine operation to completion on a fresh runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    Ok(runtime.block_on(future))
}

pub fn failure_kind(error: &VolumeError) -> &'static str {
    match error {
        _ if error.is_quota_control() => "quota",
        VolumeError::ShrinkUnsupported { .. } => "shrink",
        VolumeError::FilesystemNotFound { .. } => "not-found",
        VolumeError::Validation(_) => "validation",
        _ => "other",
    }
}
