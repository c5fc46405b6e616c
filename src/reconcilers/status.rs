// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for Kubernetes resources.
//!
//! Conditions follow the standard Kubernetes shape:
//! - `type`: The aspect of the resource being reported (e.g., "Ready")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last flipped
//!
//! # Example
//!
//! ```rust
//! use pac_operator::reconcilers::status::{create_condition, find_condition};
//!
//! let conditions = vec![create_condition(
//!     "InstallerSetReady",
//!     "True",
//!     "Installed",
//!     "",
//! )];
//! assert!(find_condition(&conditions, "InstallerSetReady").is_some());
//! ```

use crate::crd::{Condition, OpenShiftPipelinesAsCode, OpenShiftPipelinesAsCodeStatus};
use anyhow::Result;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Condition status values.
pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Create a new condition stamped with the current time.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Check if a condition has changed compared to the existing one.
///
/// Only `type`, `status` and `message` are compared; `reason` and
/// `lastTransitionTime` move together with those.
#[must_use]
pub fn condition_changed(existing: &Option<Condition>, new_condition: &Condition) -> bool {
    if let Some(current) = existing {
        current.r#type != new_condition.r#type
            || current.status != new_condition.status
            || current.message != new_condition.message
    } else {
        true
    }
}

/// Existing `lastTransitionTime` for `condition_type`, or now.
#[must_use]
pub fn get_last_transition_time(existing_conditions: &[Condition], condition_type: &str) -> String {
    existing_conditions
        .iter()
        .find(|c| c.r#type == condition_type)
        .and_then(|c| c.last_transition_time.as_ref())
        .map_or_else(|| Utc::now().to_rfc3339(), std::string::ToString::to_string)
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Returns `true` if the condition exists and its status is `True`.
#[must_use]
pub fn is_condition_true(conditions: &[Condition], condition_type: &str) -> bool {
    find_condition(conditions, condition_type).is_some_and(|c| c.status == STATUS_TRUE)
}

/// Update or add a condition in memory (no API call).
///
/// `lastTransitionTime` is preserved when the status is unchanged.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists ignoring `lastTransitionTime` and order.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr_cond| {
            curr_cond.r#type == new_cond.r#type
                && curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Returns `true` if two statuses differ in anything worth a status patch.
#[must_use]
pub fn status_changed(
    current: Option<&OpenShiftPipelinesAsCodeStatus>,
    new: &OpenShiftPipelinesAsCodeStatus,
) -> bool {
    match current {
        None => true,
        Some(current) => {
            current.version != new.version
                || current.installer_set_names != new.installer_set_names
                || current.observed_generation != new.observed_generation
                || !conditions_equal(&current.conditions, &new.conditions)
        }
    }
}

/// JSON merge patch taking the `/status` of an [`OpenShiftPipelinesAsCode`]
/// from `current` to `new`.
///
/// Merge patches never drop map keys missing from the body, so installer-set
/// names present in `current` but not in `new` are sent as `null`.
///
/// # Errors
///
/// Returns an error if `new` cannot be serialized.
pub fn status_patch(
    current: Option<&OpenShiftPipelinesAsCodeStatus>,
    new: &OpenShiftPipelinesAsCodeStatus,
) -> Result<Value> {
    let mut status = serde_json::to_value(new)?;

    let removed: Map<String, Value> = current
        .map(|c| &c.installer_set_names)
        .into_iter()
        .flatten()
        .filter(|(key, _)| !new.installer_set_names.contains_key(*key))
        .map(|(key, _)| (key.clone(), Value::Null))
        .collect();

    if !removed.is_empty() {
        if let Value::Object(fields) = &mut status {
            let names = fields
                .entry("installerSetNames")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(names) = names {
                names.extend(removed);
            }
        }
    }

    Ok(json!({ "status": status }))
}

/// Collects status changes for an [`OpenShiftPipelinesAsCode`] and writes
/// them back in a single `/status` patch.
///
/// The reconciler works on an in-memory copy of the resource; the updater is
/// created from the object as it was read and applied with the status the
/// reconciler left behind.
pub struct PipelinesAsCodeStatusUpdater {
    name: String,
    current_status: Option<OpenShiftPipelinesAsCodeStatus>,
}

impl PipelinesAsCodeStatusUpdater {
    #[must_use]
    pub fn new(pac: &OpenShiftPipelinesAsCode) -> Self {
        Self {
            name: pac.name_any(),
            current_status: pac.status.clone(),
        }
    }

    #[must_use]
    pub fn has_changes(&self, new_status: &OpenShiftPipelinesAsCodeStatus) -> bool {
        status_changed(self.current_status.as_ref(), new_status)
    }

    /// Patch `/status` if `new_status` differs from what was read.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails.
    pub async fn apply(
        &self,
        client: &Client,
        new_status: &OpenShiftPipelinesAsCodeStatus,
    ) -> Result<()> {
        if !self.has_changes(new_status) {
            debug!(name = %self.name, "OpenShiftPipelinesAsCode status unchanged, skipping update");
            return Ok(());
        }

        let api: Api<OpenShiftPipelinesAsCode> = Api::all(client.clone());
        let patch = status_patch(self.current_status.as_ref(), new_status)?;

        api.patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(
            name = %self.name,
            conditions = new_status.conditions.len(),
            installer_sets = new_status.installer_set_names.len(),
            "Updated OpenShiftPipelinesAsCode status"
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
