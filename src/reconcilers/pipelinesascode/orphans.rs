// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Garbage collection of additional-controller installer sets.
//!
//! Every custom set is labelled `created-by=OpenShiftPipelinesAsCode` and
//! `component=AdditionalPACController`. Sets whose logical name is no longer
//! an enabled key of `additionalPACControllers` are deleted, which makes the
//! live sets converge on the configured map one pass at a time.

#[allow(clippy::wildcard_imports)]
use super::types::*;

use thiserror::Error;

use crate::installerset::InstallerSetClient;
use crate::labels::name_from_custom_set_type;
use crate::metrics;

/// Failure of an orphan cleanup pass.
#[derive(Debug, Error)]
pub enum OrphanCleanupError {
    /// Live sets could not be listed; nothing was deleted
    #[error("Additional PACController Reconciliation failed: {0:#}")]
    List(anyhow::Error),

    /// Deleting the sets of `name` failed
    #[error("failed to clean up additional controller {name}: {error:#}")]
    Cleanup { name: String, error: anyhow::Error },
}

/// Selector matching every additional-controller set.
#[must_use]
pub fn additional_controller_selector() -> String {
    format!(
        "{CREATED_BY_KEY}={KIND_OPENSHIFT_PIPELINES_AS_CODE},{COMPONENT_KEY}={ADDITIONAL_PAC_CONTROLLER_COMPONENT}"
    )
}

/// Labels put on every additional-controller set.
#[must_use]
pub fn additional_controller_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            CREATED_BY_KEY.to_string(),
            KIND_OPENSHIFT_PIPELINES_AS_CODE.to_string(),
        ),
        (
            COMPONENT_KEY.to_string(),
            ADDITIONAL_PAC_CONTROLLER_COMPONENT.to_string(),
        ),
    ])
}

/// Logical controller name a custom set was created for.
///
/// The name annotation wins; sets created without it fall back to the
/// `custom-<name>` type label.
#[must_use]
pub fn logical_name(set: &TektonInstallerSet) -> Option<String> {
    if let Some(name) = set
        .annotations()
        .get(ADDITIONAL_CONTROLLER_NAME_KEY)
        .filter(|n| !n.is_empty())
    {
        return Some(name.clone());
    }

    set.labels()
        .get(INSTALLER_SET_TYPE_KEY)
        .and_then(|t| name_from_custom_set_type(t))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Names of live sets with no enabled entry in `desired`, sorted and unique.
#[must_use]
pub fn orphaned_names(
    live: &[TektonInstallerSet],
    desired: &BTreeMap<String, AdditionalPACControllerConfig>,
) -> Vec<String> {
    let mut names: Vec<String> = live
        .iter()
        .filter_map(logical_name)
        .filter(|name| !desired.get(name).is_some_and(AdditionalPACControllerConfig::is_enabled))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Delete the sets of every orphaned additional controller.
///
/// Returns the names cleaned up. Their entries are dropped from
/// `status.installerSetNames`.
///
/// # Errors
///
/// Returns the listing error, or the first cleanup failure.
pub async fn cleanup_orphans(
    installer_sets: &dyn InstallerSetClient,
    desired: &BTreeMap<String, AdditionalPACControllerConfig>,
    status: &mut OpenShiftPipelinesAsCodeStatus,
) -> Result<Vec<String>, OrphanCleanupError> {
    let selector = additional_controller_selector();
    info!(selector = %selector, "checking installer sets of additional controllers");

    let live = installer_sets
        .list_custom_sets(&selector)
        .await
        .map_err(OrphanCleanupError::List)?;
    let orphans = orphaned_names(&live, desired);

    for name in &orphans {
        info!(name = %name, "removing installer set of deleted additional controller");
        if let Err(error) = installer_sets.cleanup_custom_set(name).await {
            metrics::record_orphan_cleanup(false);
            return Err(OrphanCleanupError::Cleanup {
                name: name.clone(),
                error,
            });
        }
        metrics::record_orphan_cleanup(true);
        status.installer_set_names.remove(&custom_set_type(name));
    }

    Ok(orphans)
}

#[cfg(test)]
#[path = "orphans_tests.rs"]
mod orphans_tests;
