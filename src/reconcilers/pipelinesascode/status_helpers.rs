// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Condition management for `OpenShiftPipelinesAsCode` status.
//!
//! Five dependent conditions track the stages of a pass. `Ready` is derived
//! from them: `True` once every dependent is `True`, `False` as soon as one
//! of them is `False`, `Unknown` otherwise.

#[allow(clippy::wildcard_imports)]
use super::types::*;

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_DEPENDENCIES_INSTALLED: &str = "DependenciesInstalled";
pub const CONDITION_PRE_RECONCILER_COMPLETE: &str = "PreReconcilerComplete";
pub const CONDITION_INSTALLER_SET_READY: &str = "InstallerSetReady";
pub const CONDITION_ADDITIONAL_PAC_CONTROLLER_COMPLETE: &str = "AdditionalPACControllerComplete";
pub const CONDITION_POST_RECONCILER_COMPLETE: &str = "PostReconcilerComplete";

/// Conditions `Ready` depends on, in stage order.
pub const DEPENDENT_CONDITIONS: &[&str] = &[
    CONDITION_DEPENDENCIES_INSTALLED,
    CONDITION_PRE_RECONCILER_COMPLETE,
    CONDITION_INSTALLER_SET_READY,
    CONDITION_ADDITIONAL_PAC_CONTROLLER_COMPLETE,
    CONDITION_POST_RECONCILER_COMPLETE,
];

const REASON_ERROR: &str = "Error";
const REASON_INITIALIZED: &str = "Initialized";

/// Add every missing condition as `Unknown`.
pub fn initialize_conditions(status: &mut OpenShiftPipelinesAsCodeStatus) {
    for condition_type in DEPENDENT_CONDITIONS.iter().chain([&CONDITION_READY]) {
        if find_condition(&status.conditions, condition_type).is_none() {
            update_condition_in_memory(
                &mut status.conditions,
                condition_type,
                STATUS_UNKNOWN,
                REASON_INITIALIZED,
                "",
            );
        }
    }
}

/// Recompute `Ready` from the dependent conditions.
fn recompute_ready(status: &mut OpenShiftPipelinesAsCodeStatus) {
    let failed = DEPENDENT_CONDITIONS.iter().find_map(|t| {
        find_condition(&status.conditions, t).filter(|c| c.status == STATUS_FALSE)
    });

    if let Some(failed) = failed {
        let reason = failed.reason.clone().unwrap_or_else(|| REASON_ERROR.to_string());
        let message = failed.message.clone().unwrap_or_default();
        update_condition_in_memory(
            &mut status.conditions,
            CONDITION_READY,
            STATUS_FALSE,
            &reason,
            &message,
        );
    } else if DEPENDENT_CONDITIONS
        .iter()
        .all(|t| is_condition_true(&status.conditions, t))
    {
        update_condition_in_memory(
            &mut status.conditions,
            CONDITION_READY,
            STATUS_TRUE,
            CONDITION_READY,
            "",
        );
    } else {
        update_condition_in_memory(
            &mut status.conditions,
            CONDITION_READY,
            STATUS_UNKNOWN,
            "Progressing",
            "",
        );
    }
}

fn mark_true(status: &mut OpenShiftPipelinesAsCodeStatus, condition_type: &str) {
    update_condition_in_memory(
        &mut status.conditions,
        condition_type,
        STATUS_TRUE,
        condition_type,
        "",
    );
    recompute_ready(status);
}

fn mark_false(status: &mut OpenShiftPipelinesAsCodeStatus, condition_type: &str, message: &str) {
    update_condition_in_memory(
        &mut status.conditions,
        condition_type,
        STATUS_FALSE,
        REASON_ERROR,
        message,
    );
    recompute_ready(status);
}

/// Set `Ready` to `False` without touching the stage conditions.
pub fn mark_not_ready(status: &mut OpenShiftPipelinesAsCodeStatus, message: &str) {
    update_condition_in_memory(
        &mut status.conditions,
        CONDITION_READY,
        STATUS_FALSE,
        REASON_ERROR,
        &format!("Ready: {message}"),
    );
}

pub fn mark_dependency_installing(status: &mut OpenShiftPipelinesAsCodeStatus, message: &str) {
    mark_false(
        status,
        CONDITION_DEPENDENCIES_INSTALLED,
        &format!("Dependencies are installing: {message}"),
    );
}

pub fn mark_dependency_missing(status: &mut OpenShiftPipelinesAsCodeStatus, message: &str) {
    mark_false(
        status,
        CONDITION_DEPENDENCIES_INSTALLED,
        &format!("Dependencies are missing: {message}"),
    );
}

pub fn mark_dependencies_installed(status: &mut OpenShiftPipelinesAsCodeStatus) {
    mark_true(status, CONDITION_DEPENDENCIES_INSTALLED);
}

pub fn mark_pre_reconciler_complete(status: &mut OpenShiftPipelinesAsCodeStatus) {
    mark_true(status, CONDITION_PRE_RECONCILER_COMPLETE);
}

pub fn mark_installer_set_ready(status: &mut OpenShiftPipelinesAsCodeStatus) {
    mark_true(status, CONDITION_INSTALLER_SET_READY);
}

pub fn mark_installer_set_not_ready(status: &mut OpenShiftPipelinesAsCodeStatus, message: &str) {
    mark_false(
        status,
        CONDITION_INSTALLER_SET_READY,
        &format!("Installer set not ready: {message}"),
    );
}

pub fn mark_additional_pac_controller_complete(status: &mut OpenShiftPipelinesAsCodeStatus) {
    mark_true(status, CONDITION_ADDITIONAL_PAC_CONTROLLER_COMPLETE);
}

pub fn mark_post_reconciler_failed(status: &mut OpenShiftPipelinesAsCodeStatus, message: &str) {
    mark_false(status, CONDITION_POST_RECONCILER_COMPLETE, message);
}

pub fn mark_post_reconciler_complete(status: &mut OpenShiftPipelinesAsCodeStatus) {
    mark_true(status, CONDITION_POST_RECONCILER_COMPLETE);
}

/// Returns `true` when the aggregate `Ready` condition is `True`.
#[must_use]
pub fn is_ready(status: &OpenShiftPipelinesAsCodeStatus) -> bool {
    is_condition_true(&status.conditions, CONDITION_READY)
}

#[cfg(test)]
#[path = "status_helpers_tests.rs"]
mod status_helpers_tests;
