// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Pipelines-as-Code operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all operator CRDs
pub const API_GROUP: &str = "operator.tekton.dev";

/// API version for all operator CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "operator.tekton.dev/v1alpha1";

/// Kind name for `OpenShiftPipelinesAsCode` resource
pub const KIND_OPENSHIFT_PIPELINES_AS_CODE: &str = "OpenShiftPipelinesAsCode";

/// Kind name for `TektonInstallerSet` resource
pub const KIND_TEKTON_INSTALLER_SET: &str = "TektonInstallerSet";

/// Kind name for the `TektonPipeline` prerequisite
pub const KIND_TEKTON_PIPELINE: &str = "TektonPipeline";

/// Plural resource name of the `TektonPipeline` prerequisite
pub const PLURAL_TEKTON_PIPELINE: &str = "tektonpipelines";

// ============================================================================
// Singleton Names
// ============================================================================

/// The only `OpenShiftPipelinesAsCode` name this operator manages
pub const OPENSHIFT_PIPELINES_AS_CODE_NAME: &str = "pipelines-as-code";

/// Name of the `TektonPipeline` instance that must be ready first
pub const TEKTON_PIPELINE_NAME: &str = "pipeline";

/// Namespace the additional controllers are deployed into
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "openshift-pipelines";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "pac-operator";

// ============================================================================
// Pipelines-as-Code Manifest Names
// ============================================================================

/// Shared `ConfigMap` of the primary controller; never renamed per entry
pub const PIPELINES_AS_CODE_CONFIGMAP: &str = "pipelines-as-code";

/// Name of the controller Deployment, Service and Route in the release manifest
pub const PIPELINES_AS_CODE_CONTROLLER: &str = "pipelines-as-code-controller";

/// Name of the controller `ServiceMonitor` in the release manifest
pub const PIPELINES_AS_CODE_CONTROLLER_MONITOR: &str = "pipelines-as-code-controller-monitor";

/// Suffix appended to an additional controller's logical name
pub const ADDITIONAL_CONTROLLER_NAME_SUFFIX: &str = "-controller";

/// Suffix of the defaulted `ConfigMap` name of an additional controller
pub const ADDITIONAL_CONTROLLER_CONFIGMAP_SUFFIX: &str = "-configmap";

/// Suffix of the defaulted `Secret` name of an additional controller
pub const ADDITIONAL_CONTROLLER_SECRET_SUFFIX: &str = "-secret";

/// Environment variable naming the `ConfigMap` a controller reads
pub const ENV_PAC_CONTROLLER_CONFIGMAP: &str = "PAC_CONTROLLER_CONFIGMAP";

/// Environment variable naming the `Secret` a controller reads
pub const ENV_PAC_CONTROLLER_SECRET: &str = "PAC_CONTROLLER_SECRET";

/// Environment variable carrying the controller label
pub const ENV_PAC_CONTROLLER_LABEL: &str = "PAC_CONTROLLER_LABEL";

/// Prefix of operator environment variables that override container images
pub const PAC_IMAGE_PREFIX: &str = "IMAGE_PAC_";

// ============================================================================
// Name Length Limits
// ============================================================================

/// Maximum length of an additional controller name.
///
/// The name is embedded in the installer-set name, which already carries
/// 38 characters, and the whole must stay within 63.
pub const ADDITIONAL_CONTROLLER_NAME_MAX_LENGTH: usize = 25;

/// Maximum length of a DNS-1123 label (generic Kubernetes object name bound)
pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;

/// Maximum length of a DNS-1123 subdomain
pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue interval while a dependency or installer set is not ready (seconds)
pub const REQUEUE_WHEN_NOT_READY_SECS: u64 = 10;

/// Requeue interval for a quiescent resource (5 minutes)
pub const REQUEUE_WHEN_READY_SECS: u64 = 300;

/// Requeue interval after a hard failure (seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for Kubernetes API list operations
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;
