// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Applier for the `TektonInstallerSet`s this operator creates.
//!
//! On clusters where the Tekton operator already reconciles installer sets
//! this controller stays disabled. When enabled, each set's manifests are
//! server-side applied in order, owned by the set so that deleting the set
//! garbage collects everything it installed. The set reports `Ready` once
//! every object was applied at its current generation.

use anyhow::{anyhow, Context as _, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::discovery::{pinned_kind, Scope};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::constants::{API_GROUP_VERSION, FIELD_MANAGER, KIND_TEKTON_INSTALLER_SET};
use crate::crd::{TektonInstallerSet, TektonInstallerSetStatus};
use crate::installerset::INSTALLER_SET_READY;
use crate::manifest::{kind_of, name_of};
use crate::reconcilers::retry::retry_api_call;
use crate::reconcilers::status::{update_condition_in_memory, STATUS_FALSE, STATUS_TRUE};

const REASON_INSTALLED: &str = "Installed";
const REASON_APPLY_FAILED: &str = "ApplyFailed";

/// Split an object's `apiVersion` and `kind` into a [`GroupVersionKind`].
///
/// # Errors
///
/// Returns an error when the object carries no type information.
pub fn gvk_of(obj: &DynamicObject) -> Result<GroupVersionKind> {
    let types = obj
        .types
        .as_ref()
        .ok_or_else(|| anyhow!("manifest object {} has no apiVersion/kind", name_of(obj)))?;

    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", types.api_version.as_str()),
    };
    if version.is_empty() || types.kind.is_empty() {
        return Err(anyhow!(
            "manifest object {} has an incomplete apiVersion/kind",
            name_of(obj)
        ));
    }

    Ok(GroupVersionKind::gvk(group, version, &types.kind))
}

/// Decode the manifests carried by `set`.
///
/// # Errors
///
/// Returns the first manifest that is not a Kubernetes object.
pub fn manifest_objects(set: &TektonInstallerSet) -> Result<Vec<DynamicObject>> {
    set.spec
        .manifests
        .iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value::<DynamicObject>(value.clone())
                .with_context(|| format!("manifest {i} of {} is not an object", set.name_any()))
        })
        .collect()
}

/// Make `set` an owner of `obj`, keeping any owners it already has.
pub fn add_set_owner(obj: &mut DynamicObject, set: &TektonInstallerSet) {
    let Some(uid) = set.metadata.uid.clone() else {
        return;
    };

    let owners = obj.metadata.owner_references.get_or_insert_with(Vec::new);
    if owners.iter().any(|o| o.uid == uid) {
        return;
    }
    owners.push(OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_TEKTON_INSTALLER_SET.to_string(),
        name: set.name_any(),
        uid,
        controller: None,
        block_owner_deletion: Some(true),
    });
}

/// Status after an apply attempt at the set's current generation.
#[must_use]
pub fn applied_status(set: &TektonInstallerSet, outcome: Result<usize, &str>) -> TektonInstallerSetStatus {
    let mut status = set.status.clone().unwrap_or_default();

    match outcome {
        Ok(applied) => {
            update_condition_in_memory(
                &mut status.conditions,
                INSTALLER_SET_READY,
                STATUS_TRUE,
                REASON_INSTALLED,
                &format!("Applied {applied} resources"),
            );
            status.observed_generation = set.metadata.generation;
        }
        Err(message) => {
            update_condition_in_memory(
                &mut status.conditions,
                INSTALLER_SET_READY,
                STATUS_FALSE,
                REASON_APPLY_FAILED,
                message,
            );
        }
    }

    status
}

async fn dynamic_api(client: &Client, obj: &DynamicObject) -> Result<Api<DynamicObject>> {
    let gvk = gvk_of(obj)?;
    let (resource, capabilities): (ApiResource, _) = pinned_kind(client, &gvk)
        .await
        .with_context(|| format!("failed to discover {}/{}", gvk.group, gvk.kind))?;

    Ok(match (capabilities.scope, obj.metadata.namespace.as_deref()) {
        (Scope::Cluster, _) => Api::all_with(client.clone(), &resource),
        (Scope::Namespaced, Some(namespace)) => {
            Api::namespaced_with(client.clone(), namespace, &resource)
        }
        (Scope::Namespaced, None) => Api::default_namespaced_with(client.clone(), &resource),
    })
}

/// Server-side apply parameters for the objects of `set`.
///
/// Each set applies under its own field manager. Objects shared between sets,
/// such as the `pipelines-as-code` `ConfigMap`, then keep the owner reference
/// and fields of every set that applies them.
#[must_use]
pub fn apply_params(set: &TektonInstallerSet) -> PatchParams {
    PatchParams::apply(&format!("{FIELD_MANAGER}-{}", set.name_any())).force()
}

async fn apply_object(client: &Client, obj: &DynamicObject, params: &PatchParams) -> Result<()> {
    let api = dynamic_api(client, obj).await?;
    let name = name_of(obj).to_string();
    let apply = Patch::Apply(obj);

    retry_api_call(|| api.patch(&name, params, &apply), "apply manifest object")
        .await
        .with_context(|| format!("failed to apply {} {name}", kind_of(obj)))?;

    debug!(kind = %kind_of(obj), name = %name, "Applied manifest object");
    Ok(())
}

async fn apply_all(client: &Client, set: &TektonInstallerSet) -> Result<usize> {
    let objects = manifest_objects(set)?;
    let params = apply_params(set);
    for mut obj in objects.iter().cloned() {
        add_set_owner(&mut obj, set);
        apply_object(client, &obj, &params).await?;
    }
    Ok(objects.len())
}

/// Apply every manifest of `set` and record the outcome in its status.
///
/// # Errors
///
/// Returns the apply failure after it has been recorded on the set, or a
/// status patch failure.
pub async fn reconcile_tektoninstallerset(client: Client, set: TektonInstallerSet) -> Result<()> {
    let name = set.name_any();

    let outcome = apply_all(&client, &set).await;
    let status = match &outcome {
        Ok(applied) => {
            info!(name = %name, resources = applied, "Applied TektonInstallerSet");
            applied_status(&set, Ok(*applied))
        }
        Err(e) => {
            let message = format!("{e:#}");
            warn!(name = %name, "Failed to apply TektonInstallerSet: {message}");
            applied_status(&set, Err(message.as_str()))
        }
    };

    if set.status.as_ref() != Some(&status) {
        let api: Api<TektonInstallerSet> = Api::all(client);
        let patch = json!({ "status": status });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("failed to update status of installer set {name}"))?;
    }

    outcome.map(|_| ())
}

#[cfg(test)]
#[path = "tektoninstallerset_tests.rs"]
mod tektoninstallerset_tests;
