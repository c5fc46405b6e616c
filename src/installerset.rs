// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `TektonInstallerSet` client.
//!
//! Every logical component the operator installs (the main release, each
//! additional controller, the optional pre/post manifests) is rendered into
//! exactly one [`TektonInstallerSet`]. Sets are found again by their
//! `operator.tekton.dev/type` label, so the client can tell when a set is
//! stale and needs to be replaced.
//!
//! A set is recreated when its release-version or target-namespace annotation
//! no longer matches, and its manifests are replaced in place when only the
//! rendered content changed (tracked through a SHA-256 hash annotation).

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::constants::{
    API_GROUP_VERSION, KIND_OPENSHIFT_PIPELINES_AS_CODE, KUBE_LIST_PAGE_SIZE,
};
use crate::crd::{OpenShiftPipelinesAsCode, TektonInstallerSet, TektonInstallerSetSpec};
use crate::errors::{ReconcileEvent, TransformError};
use crate::labels::{
    custom_set_type, ADDITIONAL_CONTROLLER_NAME_KEY, CREATED_BY_KEY, INSTALLER_SET_TYPE_KEY,
    INSTALLER_TYPE_MAIN, INSTALLER_TYPE_POST, INSTALLER_TYPE_PRE, LAST_APPLIED_HASH_KEY,
    RELEASE_VERSION_KEY, TARGET_NAMESPACE_KEY,
};
use crate::manifest::Manifest;
use crate::metrics;
use crate::reconcilers::retry::{is_not_found, retry_api_call};
use crate::reconcilers::status::is_condition_true;

/// Prefix of every generated installer-set name.
const INSTALLER_SET_NAME_PREFIX: &str = "openshiftpipelinesascode";

/// Condition an installer set reports once its manifests are applied.
pub const INSTALLER_SET_READY: &str = "Ready";

/// Renders the manifest that goes into one installer set.
pub type ManifestTransform = dyn Fn(&Manifest) -> Result<Manifest, TransformError> + Send + Sync;

/// Creates, inspects and deletes the installer sets owned by an
/// [`OpenShiftPipelinesAsCode`].
///
/// The `*_set` operations return the name of the set backing the component
/// once it exists and reports ready. Anything short of that is surfaced as a
/// [`ReconcileEvent`] inside the returned error.
#[async_trait]
pub trait InstallerSetClient: Send + Sync {
    /// Ensure the `main` set for the primary release manifest.
    async fn main_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        manifest: &Manifest,
        transform: &ManifestTransform,
    ) -> Result<String>;

    /// Ensure the `custom-<name>` set for one additional controller.
    async fn custom_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        name: &str,
        manifest: &Manifest,
        transform: &ManifestTransform,
        labels: &BTreeMap<String, String>,
    ) -> Result<String>;

    /// List custom sets matching `label_selector`.
    async fn list_custom_sets(&self, label_selector: &str) -> Result<Vec<TektonInstallerSet>>;

    /// Delete every set backing the custom component `name`.
    async fn cleanup_custom_set(&self, name: &str) -> Result<()>;

    async fn pre_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        manifest: &Manifest,
        transform: &ManifestTransform,
    ) -> Result<String>;

    async fn post_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        manifest: &Manifest,
        transform: &ManifestTransform,
    ) -> Result<String>;

    async fn cleanup_pre_set(&self) -> Result<()>;

    async fn cleanup_post_set(&self) -> Result<()>;
}

/// Label selector matching every set of one type created by this operator.
#[must_use]
pub fn set_type_selector(set_type: &str) -> String {
    format!(
        "{CREATED_BY_KEY}={KIND_OPENSHIFT_PIPELINES_AS_CODE},{INSTALLER_SET_TYPE_KEY}={set_type}"
    )
}

/// SHA-256 of the rendered resources, hex encoded.
///
/// # Errors
///
/// Returns an error if the resources cannot be serialized.
pub fn manifest_hash(manifest: &Manifest) -> Result<String> {
    let bytes = serde_json::to_vec(manifest.resources())
        .context("failed to serialize rendered manifest")?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Build the owner reference pointing an installer set at its owner.
#[must_use]
pub fn owner_reference(owner: &OpenShiftPipelinesAsCode) -> OwnerReference {
    OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_OPENSHIFT_PIPELINES_AS_CODE.to_string(),
        name: owner.name_any(),
        uid: owner.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// What to do with the sets found for one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetAction {
    /// No set exists yet
    Create,
    /// Stale or duplicated sets must go before a new one is created
    Delete(Vec<String>),
    /// Rendered content changed; replace the manifests of this set
    Update(String),
    /// Set is current; wait for it to report ready
    Check(String),
}

/// Decide how to converge the `existing` sets of one type.
///
/// `version` and `target_namespace` are the current release and namespace,
/// `hash` the hash of the freshly rendered manifest.
#[must_use]
pub fn plan_set_action(
    existing: &[TektonInstallerSet],
    version: &str,
    target_namespace: &str,
    hash: &str,
) -> SetAction {
    match existing {
        [] => SetAction::Create,
        [set] => {
            let annotations = set.annotations();
            let annotation = |key: &str| annotations.get(key).map(String::as_str);

            if annotation(RELEASE_VERSION_KEY) != Some(version)
                || annotation(TARGET_NAMESPACE_KEY) != Some(target_namespace)
            {
                SetAction::Delete(vec![set.name_any()])
            } else if annotation(LAST_APPLIED_HASH_KEY) != Some(hash) {
                SetAction::Update(set.name_any())
            } else {
                SetAction::Check(set.name_any())
            }
        }
        sets => SetAction::Delete(sets.iter().map(ResourceExt::name_any).collect()),
    }
}

/// Returns `true` once the set's controller applied its current generation.
#[must_use]
pub fn is_set_ready(set: &TektonInstallerSet) -> bool {
    let Some(status) = set.status.as_ref() else {
        return false;
    };

    let generation_observed = match (set.metadata.generation, status.observed_generation) {
        (Some(generation), Some(observed)) => observed >= generation,
        _ => true,
    };

    generation_observed && is_condition_true(&status.conditions, INSTALLER_SET_READY)
}

/// [`InstallerSetClient`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeInstallerSetClient {
    api: Api<TektonInstallerSet>,
    version: String,
    default_namespace: String,
}

impl KubeInstallerSetClient {
    #[must_use]
    pub fn new(client: Client, version: &str, default_namespace: &str) -> Self {
        Self {
            api: Api::all(client),
            version: version.to_string(),
            default_namespace: default_namespace.to_string(),
        }
    }

    fn target_namespace(&self, owner: &OpenShiftPipelinesAsCode) -> String {
        if owner.spec.target_namespace.is_empty() {
            self.default_namespace.clone()
        } else {
            owner.spec.target_namespace.clone()
        }
    }

    async fn list_by_selector(&self, label_selector: &str) -> Result<Vec<TektonInstallerSet>> {
        let mut sets = Vec::new();
        let mut params = ListParams::default()
            .labels(label_selector)
            .limit(KUBE_LIST_PAGE_SIZE);

        loop {
            let page = retry_api_call(|| self.api.list(&params), "list TektonInstallerSets")
                .await
                .with_context(|| format!("failed to list installer sets with {label_selector}"))?;

            let continue_token = page.metadata.continue_.clone();
            sets.extend(page.items);

            match continue_token {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        Ok(sets)
    }

    async fn delete_set(&self, name: &str, set_type: &str) -> Result<()> {
        let params = DeleteParams::background();
        match retry_api_call(
            || self.api.delete(name, &params),
            "delete TektonInstallerSet",
        )
        .await
        {
            Ok(_) => {
                info!(name, set_type, "Deleted TektonInstallerSet");
                metrics::record_installer_set_deleted(set_type);
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                debug!(name, set_type, "TektonInstallerSet already gone");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("failed to delete installer set {name}")),
        }
    }

    async fn cleanup_type(&self, set_type: &str) -> Result<()> {
        for set in self.list_by_selector(&set_type_selector(set_type)).await? {
            self.delete_set(&set.name_any(), set_type).await?;
        }
        Ok(())
    }

    /// Converge the single set of `set_type` towards the rendered manifest.
    async fn ensure_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        set_type: &str,
        manifest: &Manifest,
        transform: &ManifestTransform,
        extra_labels: &BTreeMap<String, String>,
        extra_annotations: &BTreeMap<String, String>,
    ) -> Result<String> {
        let rendered = transform(manifest)?;
        let hash = manifest_hash(&rendered)?;
        let target_namespace = self.target_namespace(owner);

        let existing = self.list_by_selector(&set_type_selector(set_type)).await?;

        match plan_set_action(&existing, &self.version, &target_namespace, &hash) {
            SetAction::Create => {
                let name = self
                    .create_set(
                        owner,
                        set_type,
                        &rendered,
                        &hash,
                        &target_namespace,
                        extra_labels,
                        extra_annotations,
                    )
                    .await?;
                debug!(name, set_type, "Waiting for new TektonInstallerSet to become ready");
                Err(ReconcileEvent::requeue_after_default().into())
            }
            SetAction::Delete(names) => {
                warn!(
                    set_type,
                    count = names.len(),
                    "Stale TektonInstallerSets found, deleting"
                );
                for name in &names {
                    self.delete_set(name, set_type).await?;
                }
                Err(ReconcileEvent::ReconcileAgain.into())
            }
            SetAction::Update(name) => {
                self.update_manifests(&name, &rendered, &hash).await?;
                metrics::record_installer_set_updated(set_type);
                info!(name, set_type, "Updated TektonInstallerSet manifests");
                Err(ReconcileEvent::requeue_after_default().into())
            }
            SetAction::Check(name) => {
                let ready = existing.first().is_some_and(is_set_ready);
                if ready {
                    Ok(name)
                } else {
                    debug!(name, set_type, "TektonInstallerSet not ready yet");
                    Err(ReconcileEvent::requeue_after_default().into())
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        set_type: &str,
        rendered: &Manifest,
        hash: &str,
        target_namespace: &str,
        extra_labels: &BTreeMap<String, String>,
        extra_annotations: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut labels = extra_labels.clone();
        labels.insert(
            CREATED_BY_KEY.to_string(),
            KIND_OPENSHIFT_PIPELINES_AS_CODE.to_string(),
        );
        labels.insert(INSTALLER_SET_TYPE_KEY.to_string(), set_type.to_string());

        let mut annotations = extra_annotations.clone();
        annotations.insert(RELEASE_VERSION_KEY.to_string(), self.version.clone());
        annotations.insert(TARGET_NAMESPACE_KEY.to_string(), target_namespace.to_string());
        annotations.insert(LAST_APPLIED_HASH_KEY.to_string(), hash.to_string());

        let manifests = rendered
            .resources()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .context("failed to encode rendered manifest")?;

        let set = TektonInstallerSet {
            metadata: ObjectMeta {
                generate_name: Some(format!("{INSTALLER_SET_NAME_PREFIX}-{set_type}-")),
                labels: Some(labels),
                annotations: Some(annotations),
                owner_references: Some(vec![owner_reference(owner)]),
                ..Default::default()
            },
            spec: TektonInstallerSetSpec { manifests },
            status: None,
        };

        let params = PostParams::default();
        let created = retry_api_call(
            || self.api.create(&params, &set),
            "create TektonInstallerSet",
        )
        .await
        .with_context(|| format!("failed to create {set_type} installer set"))?;

        let name = created.name_any();
        info!(name, set_type, resources = rendered.len(), "Created TektonInstallerSet");
        metrics::record_installer_set_created(set_type);
        Ok(name)
    }

    async fn update_manifests(&self, name: &str, rendered: &Manifest, hash: &str) -> Result<()> {
        let patch = json!({
            "metadata": {
                "annotations": { LAST_APPLIED_HASH_KEY: hash }
            },
            "spec": { "manifests": rendered.resources() }
        });

        let params = PatchParams::default();
        let merge = Patch::Merge(&patch);
        retry_api_call(
            || self.api.patch(name, &params, &merge),
            "patch TektonInstallerSet",
        )
        .await
        .with_context(|| format!("failed to update installer set {name}"))?;
        Ok(())
    }
}

#[async_trait]
impl InstallerSetClient for KubeInstallerSetClient {
    async fn main_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        manifest: &Manifest,
        transform: &ManifestTransform,
    ) -> Result<String> {
        self.ensure_set(
            owner,
            INSTALLER_TYPE_MAIN,
            manifest,
            transform,
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .await
    }

    async fn custom_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        name: &str,
        manifest: &Manifest,
        transform: &ManifestTransform,
        labels: &BTreeMap<String, String>,
    ) -> Result<String> {
        let annotations =
            BTreeMap::from([(ADDITIONAL_CONTROLLER_NAME_KEY.to_string(), name.to_string())]);
        self.ensure_set(
            owner,
            &custom_set_type(name),
            manifest,
            transform,
            labels,
            &annotations,
        )
        .await
    }

    async fn list_custom_sets(&self, label_selector: &str) -> Result<Vec<TektonInstallerSet>> {
        self.list_by_selector(label_selector).await
    }

    async fn cleanup_custom_set(&self, name: &str) -> Result<()> {
        self.cleanup_type(&custom_set_type(name)).await
    }

    async fn pre_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        manifest: &Manifest,
        transform: &ManifestTransform,
    ) -> Result<String> {
        self.ensure_set(
            owner,
            INSTALLER_TYPE_PRE,
            manifest,
            transform,
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .await
    }

    async fn post_set(
        &self,
        owner: &OpenShiftPipelinesAsCode,
        manifest: &Manifest,
        transform: &ManifestTransform,
    ) -> Result<String> {
        self.ensure_set(
            owner,
            INSTALLER_TYPE_POST,
            manifest,
            transform,
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .await
    }

    async fn cleanup_pre_set(&self) -> Result<()> {
        self.cleanup_type(INSTALLER_TYPE_PRE).await
    }

    async fn cleanup_post_set(&self) -> Result<()> {
        self.cleanup_type(INSTALLER_TYPE_POST).await
    }
}

#[cfg(test)]
#[path = "installerset_tests.rs"]
mod installerset_tests;
