// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Platform hooks around the reconcile pass.
//!
//! An [`Extension`] is injected once at startup. It can install extra
//! resources before and after the main installer sets, and contribute
//! transformers to every rendered manifest.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMapVolumeSource, KeyToPath, Volume, VolumeMount};
use kube::api::DynamicObject;
use serde_json::Value;
use tracing::debug;

use crate::crd::OpenShiftPipelinesAsCode;
use crate::errors::TransformError;
use crate::installerset::InstallerSetClient;
use crate::manifest::{from_typed, kind_of, to_typed, Manifest, Transformer};
use crate::transform::inject_namespace;

/// `ConfigMap` the cluster network operator fills with the trusted CA bundle.
pub const TRUSTED_CA_CONFIGMAP: &str = "config-trusted-cabundle";
const TRUSTED_CA_VOLUME: &str = "config-trusted-cabundle-volume";
const TRUSTED_CA_KEY: &str = "ca-bundle.crt";

/// `ConfigMap` the service CA operator fills with the service serving CA.
pub const SERVICE_CA_CONFIGMAP: &str = "config-service-cabundle";
const SERVICE_CA_VOLUME: &str = "config-service-cabundle-volume";
const SERVICE_CA_KEY: &str = "service-ca.crt";

/// Directory the CA bundles are mounted under in every container.
pub const CUSTOM_CERTS_DIR: &str = "/tekton-custom-certs";

/// Platform-specific behavior of the reconciler.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Runs after dependencies are ready and before the main installer set.
    async fn pre_reconcile(&self, owner: &OpenShiftPipelinesAsCode) -> Result<()>;

    /// Runs once every installer set converged.
    async fn post_reconcile(&self, owner: &OpenShiftPipelinesAsCode) -> Result<()>;

    /// Extra transformers appended to every rendered manifest.
    fn transformers(&self, owner: &OpenShiftPipelinesAsCode) -> Vec<Transformer>;
}

/// Extension that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtension;

#[async_trait]
impl Extension for NoopExtension {
    async fn pre_reconcile(&self, _owner: &OpenShiftPipelinesAsCode) -> Result<()> {
        Ok(())
    }

    async fn post_reconcile(&self, _owner: &OpenShiftPipelinesAsCode) -> Result<()> {
        Ok(())
    }

    fn transformers(&self, _owner: &OpenShiftPipelinesAsCode) -> Vec<Transformer> {
        Vec::new()
    }
}

/// OpenShift behavior: pod security is left to SCC admission, and optional
/// pre/post manifests are installed through their own installer sets.
pub struct OpenShiftExtension {
    installer_sets: Arc<dyn InstallerSetClient>,
    pre_manifest: Option<Manifest>,
    post_manifest: Option<Manifest>,
    default_namespace: String,
}

impl OpenShiftExtension {
    #[must_use]
    pub fn new(
        installer_sets: Arc<dyn InstallerSetClient>,
        pre_manifest: Option<Manifest>,
        post_manifest: Option<Manifest>,
        default_namespace: &str,
    ) -> Self {
        Self {
            installer_sets,
            pre_manifest,
            post_manifest,
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

    fn staged_transformers(&self, owner: &OpenShiftPipelinesAsCode) -> Vec<Transformer> {
        let mut transformers = vec![inject_namespace(&self.target_namespace(owner))];
        transformers.extend(self.transformers(owner));
        transformers
    }
}

#[async_trait]
impl Extension for OpenShiftExtension {
    async fn pre_reconcile(&self, owner: &OpenShiftPipelinesAsCode) -> Result<()> {
        let Some(manifest) = self.pre_manifest.as_ref().filter(|m| !m.is_empty()) else {
            return self.installer_sets.cleanup_pre_set().await;
        };

        let transformers = self.staged_transformers(owner);
        let transform = move |m: &Manifest| m.transform(&transformers);
        let name = self.installer_sets.pre_set(owner, manifest, &transform).await?;
        debug!(name, "pre installer set ready");
        Ok(())
    }

    async fn post_reconcile(&self, owner: &OpenShiftPipelinesAsCode) -> Result<()> {
        let Some(manifest) = self.post_manifest.as_ref().filter(|m| !m.is_empty()) else {
            return self.installer_sets.cleanup_post_set().await;
        };

        let transformers = self.staged_transformers(owner);
        let transform = move |m: &Manifest| m.transform(&transformers);
        let name = self.installer_sets.post_set(owner, manifest, &transform).await?;
        debug!(name, "post installer set ready");
        Ok(())
    }

    fn transformers(&self, _owner: &OpenShiftPipelinesAsCode) -> Vec<Transformer> {
        vec![
            remove_pod_security_field("runAsUser"),
            remove_pod_security_field("runAsGroup"),
            apply_ca_bundles(),
        ]
    }
}

/// Drop `field` from the pod and container security contexts of Deployments.
pub fn remove_pod_security_field(field: &'static str) -> Transformer {
    Arc::new(move |obj: &mut DynamicObject| -> Result<(), TransformError> {
        if kind_of(obj) != "Deployment" {
            return Ok(());
        }

        let Some(pod_spec) = obj.data.pointer_mut("/spec/template/spec") else {
            return Ok(());
        };

        if let Some(Value::Object(ctx)) = pod_spec.get_mut("securityContext") {
            ctx.remove(field);
        }

        for list in ["containers", "initContainers"] {
            if let Some(Value::Array(containers)) = pod_spec.get_mut(list) {
                for container in containers {
                    if let Some(Value::Object(ctx)) = container.get_mut("securityContext") {
                        ctx.remove(field);
                    }
                }
            }
        }
        Ok(())
    })
}

/// Mount the trusted and service CA bundles into every container of Deployments.
///
/// Deployments that already carry the trusted bundle volume are left alone.
pub fn apply_ca_bundles() -> Transformer {
    Arc::new(|obj: &mut DynamicObject| -> Result<(), TransformError> {
        if kind_of(obj) != "Deployment" {
            return Ok(());
        }
        let mut deployment: Deployment = to_typed(obj)?;
        let Some(pod) = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
        else {
            return Ok(());
        };

        let volumes = pod.volumes.get_or_insert_with(Vec::new);
        if volumes.iter().any(|v| v.name == TRUSTED_CA_VOLUME) {
            return Ok(());
        }
        volumes.push(ca_volume(TRUSTED_CA_VOLUME, TRUSTED_CA_CONFIGMAP, TRUSTED_CA_KEY));
        volumes.push(ca_volume(SERVICE_CA_VOLUME, SERVICE_CA_CONFIGMAP, SERVICE_CA_KEY));

        for container in &mut pod.containers {
            let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
            mounts.push(ca_mount(TRUSTED_CA_VOLUME, TRUSTED_CA_KEY));
            mounts.push(ca_mount(SERVICE_CA_VOLUME, SERVICE_CA_KEY));
        }

        from_typed(&deployment, obj)
    })
}

fn ca_volume(volume: &str, config_map: &str, key: &str) -> Volume {
    Volume {
        name: volume.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            items: Some(vec![KeyToPath {
                key: key.to_string(),
                path: key.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn ca_mount(volume: &str, key: &str) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: format!("{CUSTOM_CERTS_DIR}/{key}"),
        sub_path: Some(key.to_string()),
        read_only: Some(true),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "extension_tests.rs"]
mod extension_tests;
