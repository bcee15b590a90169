//! BDD scenarios for the volume lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle};

#[scenario(
    path = "tests/features/volume_lifecycle.feature",
    name = "Create, grow, inspect, and remove an NFS volume"
)]
fn scenario_full_lifecycle(lifecycle: LifecycleContext) {
    drop(lifecycle);
}

#[scenario(
    path = "tests/features/volume_lifecycle.feature",
    name = "Repeat a creation without provisioning twice"
)]
fn scenario_idempotent_create(lifecycle: LifecycleContext) {
    drop(lifecycle);
}

#[scenario(
    path = "tests/features/volume_lifecycle.feature",
    name = "Leave the array untouched under quota control"
)]
fn scenario_quota_control(lifecycle: LifecycleContext) {
    drop(lifecycle);
}

#[scenario(
    path = "tests/features/volume_lifecycle.feature",
    name = "Refuse to shrink a volume"
)]
fn scenario_refuse_shrink(lifecycle: LifecycleContext) {
    drop(lifecycle);
}
