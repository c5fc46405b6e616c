// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Short-form application label used by the Pipelines-as-Code manifests
pub const APP_LABEL: &str = "app";

/// Label the Pipelines-as-Code Route carries to identify its controller
pub const PAC_ROUTE_LABEL: &str = "pipelines-as-code/route";

// ============================================================================
// Operator Labels
// ============================================================================

/// Label naming the owner kind that created an installer set
pub const CREATED_BY_KEY: &str = "operator.tekton.dev/created-by";

/// Label naming the logical component an installer set belongs to
pub const COMPONENT_KEY: &str = "operator.tekton.dev/component";

/// Label carrying the installer-set type (`main`, `pre`, `post`, `custom-<name>`)
pub const INSTALLER_SET_TYPE_KEY: &str = "operator.tekton.dev/type";

/// Label stamped on every rendered operand resource
pub const OPERAND_NAME_KEY: &str = "operator.tekton.dev/operand-name";

// ============================================================================
// Label Values
// ============================================================================

/// Component value for additional Pipelines-as-Code controller installer sets
pub const ADDITIONAL_PAC_CONTROLLER_COMPONENT: &str = "AdditionalPACController";

/// Operand name of the Pipelines-as-Code component
pub const OPERAND_OPENSHIFT_PIPELINES_AS_CODE: &str = "openshift-pipelines-as-code";

/// Installer-set type for the primary manifest
pub const INSTALLER_TYPE_MAIN: &str = "main";

/// Installer-set type for resources applied before the main set
pub const INSTALLER_TYPE_PRE: &str = "pre";

/// Installer-set type for resources applied after the main set
pub const INSTALLER_TYPE_POST: &str = "post";

/// Installer-set type prefix for named custom sets
pub const INSTALLER_TYPE_CUSTOM: &str = "custom";

// ============================================================================
// Operator Annotations
// ============================================================================

/// Annotation recording the release version an installer set was rendered for
pub const RELEASE_VERSION_KEY: &str = "operator.tekton.dev/release-version";

/// Annotation recording the namespace an installer set targets
pub const TARGET_NAMESPACE_KEY: &str = "operator.tekton.dev/target-namespace";

/// Annotation holding the SHA-256 of the rendered manifests stored in the set
pub const LAST_APPLIED_HASH_KEY: &str = "operator.tekton.dev/last-applied-hash";

/// Annotation holding the exact logical name of an additional controller set
pub const ADDITIONAL_CONTROLLER_NAME_KEY: &str = "operator.tekton.dev/additional-controller-name";

/// Build the installer-set type value of a custom set.
///
/// ```
/// use pac_operator::labels::custom_set_type;
/// assert_eq!(custom_set_type("test"), "custom-test");
/// ```
#[must_use]
pub fn custom_set_type(name: &str) -> String {
    format!("{INSTALLER_TYPE_CUSTOM}-{name}")
}

/// Recover a logical name from a custom installer-set type value.
///
/// Returns `None` when the value does not carry the custom prefix.
#[must_use]
pub fn name_from_custom_set_type(set_type: &str) -> Option<&str> {
    set_type
        .strip_prefix(INSTALLER_TYPE_CUSTOM)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|name| !name.is_empty())
}
