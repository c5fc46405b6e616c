// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for the Pipelines-as-Code operator.
//!
//! # Resource Types
//!
//! - [`OpenShiftPipelinesAsCode`] - The singleton owner resource describing the desired
//!   Pipelines-as-Code installation and any additional controller instances
//! - [`TektonInstallerSet`] - A named bundle of rendered manifests applied as one unit,
//!   used to diff and clean up what the operator created
//!
//! # Example: Declaring an additional controller
//!
//! ```rust
//! use pac_operator::crd::{AdditionalPACControllerConfig, PACSettings};
//! use std::collections::BTreeMap;
//!
//! let mut controllers = BTreeMap::new();
//! controllers.insert(
//!     "gitlab".to_string(),
//!     AdditionalPACControllerConfig {
//!         enable: Some(true),
//!         config_map_name: "gitlab-configmap".to_string(),
//!         secret_name: "gitlab-secret".to_string(),
//!         settings: None,
//!     },
//! );
//!
//! let settings = PACSettings {
//!     settings: None,
//!     additional_pac_controllers: Some(controllers),
//! };
//! assert_eq!(settings.additional_pac_controllers.map(|c| c.len()), Some(1));
//! ```

use k8s_openapi::api::core::v1::Toleration;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. `Ready` or `InstallerSetReady`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Pipelines-as-Code configuration shared by the primary controller and
/// every additional controller entry.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
pub struct PACSettings {
    /// Free-form Pipelines-as-Code settings copied into the controller `ConfigMap`.
    ///
    /// Keys not set here are filled from the Pipelines-as-Code defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<BTreeMap<String, String>>,

    /// Additional controller instances keyed by their logical name.
    ///
    /// The key must be a DNS-1123 subdomain of at most 25 characters since it is
    /// embedded in the name of the installer set that carries the instance.
    #[serde(
        default,
        rename = "additionalPACControllers",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_pac_controllers: Option<BTreeMap<String, AdditionalPACControllerConfig>>,
}

/// Configuration of one additional Pipelines-as-Code controller.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalPACControllerConfig {
    /// Whether this controller is deployed. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    /// `ConfigMap` the controller reads. Defaults to `<name>-configmap`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config_map_name: String,

    /// `Secret` the controller reads. Defaults to `<name>-secret`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,

    /// Settings written into this controller's `ConfigMap`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<BTreeMap<String, String>>,
}

impl AdditionalPACControllerConfig {
    /// Returns `true` unless the entry was explicitly disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enable.unwrap_or(true)
    }
}

/// `OpenShiftPipelinesAsCode` installs Pipelines-as-Code and its additional controllers.
///
/// Only the instance named `pipelines-as-code` is reconciled; any other name is
/// marked not ready and otherwise ignored.
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.tekton.dev/v1alpha1
/// kind: OpenShiftPipelinesAsCode
/// metadata:
///   name: pipelines-as-code
/// spec:
///   targetNamespace: openshift-pipelines
///   settings:
///     application-name: Pipelines as Code CI
///   additionalPACControllers:
///     gitlab:
///       configMapName: gitlab-configmap
///       secretName: gitlab-secret
///       settings:
///         hub-url: https://hub.example.com/v1
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "operator.tekton.dev",
    version = "v1alpha1",
    kind = "OpenShiftPipelinesAsCode",
    plural = "openshiftpipelinesascodes",
    shortname = "opac",
    doc = "OpenShiftPipelinesAsCode installs Pipelines-as-Code on the cluster. The singleton instance named pipelines-as-code renders the release manifest and any additional controllers into TektonInstallerSets."
)]
#[kube(status = "OpenShiftPipelinesAsCodeStatus")]
#[kube(printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version"}"#)]
#[kube(
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftPipelinesAsCodeSpec {
    /// Namespace the primary Pipelines-as-Code components are installed into.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_namespace: String,

    /// Scheduling applied to every Pipelines-as-Code workload.
    #[serde(default, skip_serializing_if = "WorkloadConfig::is_empty")]
    pub config: WorkloadConfig,

    /// Pipelines-as-Code settings and additional controllers.
    #[serde(flatten)]
    pub pac_settings: PACSettings,
}

/// Pod scheduling for the `Deployment`s and `StatefulSet`s the operator installs.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority_class_name: String,
}

impl WorkloadConfig {
    /// Returns `true` when nothing would be changed on a workload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_selector.is_empty()
            && self.tolerations.is_empty()
            && self.priority_class_name.is_empty()
    }
}

/// `OpenShiftPipelinesAsCode` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftPipelinesAsCodeStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Operator release version that last reconciled this resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Installer-set name per logical component (`main`, `custom-<name>`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub installer_set_names: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// `TektonInstallerSet` bundles rendered manifests that are applied, tracked and
/// deleted together.
///
/// The operator creates one set per logical component and labels it so that
/// sets belonging to removed additional controllers can be found and deleted.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "operator.tekton.dev",
    version = "v1alpha1",
    kind = "TektonInstallerSet",
    plural = "tektoninstallersets",
    doc = "TektonInstallerSet is a named set of rendered Kubernetes manifests applied and garbage collected as one unit."
)]
#[kube(status = "TektonInstallerSetStatus")]
#[serde(rename_all = "camelCase")]
pub struct TektonInstallerSetSpec {
    /// Rendered Kubernetes objects, in apply order.
    #[serde(default)]
    #[schemars(schema_with = "arbitrary_objects")]
    pub manifests: Vec<serde_json::Value>,
}

/// `TektonInstallerSet` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TektonInstallerSetStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

fn arbitrary_objects(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "array",
        "items": {
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true
        }
    })
}
