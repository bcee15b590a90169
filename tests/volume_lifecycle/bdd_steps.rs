//! BDD step definitions for volume create, expand, query, and delete.

use dme_aseries::client::QUOTA_CONTROL_CODE;
use dme_aseries::test_support::fixtures;
use dme_aseries::{CreateVolumeParams, Protocol};
use rstest_bdd_macros::{given, then, when};
use serde_json::json;

use super::test_helpers::{LifecycleContext, LifecycleOutcome, StepError};

#[given("an array with an empty inventory")]
fn empty_array(lifecycle: LifecycleContext) -> LifecycleContext {
    lifecycle
}

#[given("an array holding filesystem \"{name}\" with \"{sectors}\" sectors")]
fn array_with_filesystem(
    mut lifecycle: LifecycleContext,
    name: String,
    sectors: u64,
) -> LifecycleContext {
    lifecycle.inventory.add_filesystem(&name, sectors);
    lifecycle
}

#[given("the array enforces quota control")]
fn quota_control(mut lifecycle: LifecycleContext) -> LifecycleContext {
    lifecycle.inventory.fail_creation_with(
        &json!({ "error_code": QUOTA_CONTROL_CODE, "error_message": "quota control" }).to_string(),
    );
    lifecycle
}

#[when("I create an NFS volume \"{name}\" of \"{bytes}\" bytes")]
fn create_nfs_volume(
    lifecycle: LifecycleContext,
    name: String,
    bytes: u64,
) -> Result<LifecycleContext, StepError> {
    let mut params = CreateVolumeParams::new(name, bytes, fixtures::POOL_NAME, Protocol::Nfs);
    params.authorized_clients = vec![String::from("*")];
    lifecycle.drive(
        |engine| async move { engine.create(params).await },
        LifecycleOutcome::Volume,
    )
}

#[when("I expand volume \"{name}\" to \"{bytes}\" bytes")]
fn expand_volume(
    lifecycle: LifecycleContext,
    name: String,
    bytes: u64,
) -> Result<LifecycleContext, StepError> {
    lifecycle.drive(
        |engine| async move { engine.expand(&name, bytes).await },
        |()| LifecycleOutcome::Done,
    )
}

#[when("I query volume \"{name}\"")]
fn query_volume(lifecycle: LifecycleContext, name: String) -> Result<LifecycleContext, StepError> {
    lifecycle.drive(
        |engine| async move { engine.query(&name).await },
        LifecycleOutcome::Volume,
    )
}

#[when("I delete volume \"{name}\"")]
fn delete_volume(lifecycle: LifecycleContext, name: String) -> Result<LifecycleContext, StepError> {
    lifecycle.drive(
        |engine| async move { engine.delete(&name).await },
        |()| LifecycleOutcome::Done,
    )
}

#[then("filesystem \"{name}\" has \"{sectors}\" sectors")]
fn filesystem_has_capacity(
    lifecycle: &LifecycleContext,
    name: String,
    sectors: u64,
) -> Result<(), StepError> {
    let filesystem = lifecycle
        .inventory
        .filesystems()
        .iter()
        .find(|filesystem| filesystem.name == name)
        .ok_or_else(|| StepError::Assertion(format!("filesystem {name} is missing")))?;
    if filesystem.capacity == sectors {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {sectors} sectors, found {}",
            filesystem.capacity
        )))
    }
}

#[then("the reported size is \"{bytes}\" bytes")]
fn reported_size(lifecycle: &LifecycleContext, bytes: u64) -> Result<(), StepError> {
    match &lifecycle.outcome {
        Some(LifecycleOutcome::Volume(volume)) if volume.size == bytes => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a volume of {bytes} bytes, got {other:?}"
        ))),
    }
}

#[then("the array holds no filesystems or shares")]
fn array_is_empty(lifecycle: &LifecycleContext) -> Result<(), StepError> {
    let inventory = &lifecycle.inventory;
    if inventory.filesystems().is_empty()
        && inventory.nfs_share_paths().is_empty()
        && inventory.dataturbo_share_paths().is_empty()
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("array still holds {inventory:?}")))
    }
}

#[then("\"{count}\" creation request was sent")]
fn creation_requests(lifecycle: &LifecycleContext, count: usize) -> Result<(), StepError> {
    if lifecycle.creation_requests == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} creation requests, saw {}",
            lifecycle.creation_requests
        )))
    }
}

#[then("the operation fails with \"{kind}\"")]
fn operation_fails_with(lifecycle: &LifecycleContext, kind: String) -> Result<(), StepError> {
    let Some(LifecycleOutcome::Failed(failure)) = &lifecycle.outcome else {
        return Err(StepError::Assertion(format!(
            "expected a failure, got {:?}",
            lifecycle.outcome
        )));
    };
    if failure.kind == kind {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure kind {kind}, got {}: {}",
            failure.kind, failure.message
        )))
    }
}
