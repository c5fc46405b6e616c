// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Validation for `OpenShiftPipelinesAsCode` resources.
//!
//! Validation never stops at the first problem: every violation is collected
//! and returned as a [`FieldError`] tagged with the offending field path, so
//! a user fixing one field at a time always sees the full remaining list.

use kube::ResourceExt;

use crate::constants::{
    ADDITIONAL_CONTROLLER_NAME_MAX_LENGTH, DNS1123_LABEL_MAX_LENGTH, DNS1123_SUBDOMAIN_MAX_LENGTH,
};
use crate::crd::{AdditionalPACControllerConfig, OpenShiftPipelinesAsCode, PACSettings};
use crate::settings;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value: {message}: {path}")]
pub struct FieldError {
    /// Dotted path of the offending field, e.g. `spec.additionalPACControllers`
    pub path: String,
    pub message: String,
}

impl FieldError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Join validation errors into one human-readable message.
#[must_use]
pub fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate an `OpenShiftPipelinesAsCode` resource.
///
/// Resources being deleted are not validated.
#[must_use]
pub fn validate(pac: &OpenShiftPipelinesAsCode) -> Vec<FieldError> {
    if pac.metadata.deletion_timestamp.is_some() {
        return Vec::new();
    }

    let mut errs = Vec::new();
    if !pac.spec.target_namespace.is_empty() && !is_dns1123_label(&pac.spec.target_namespace) {
        errs.push(FieldError::new(
            "spec.targetNamespace",
            format!(
                "invalid namespace {:?}: must be a valid DNS label",
                pac.spec.target_namespace
            ),
        ));
    }
    errs.extend(validate_pac_settings(&pac.spec.pac_settings, "spec"));

    if !errs.is_empty() {
        tracing::debug!(name = %pac.name_any(), count = errs.len(), "validation failed");
    }
    errs
}

/// Validate the settings map and every additional controller under `path`.
#[must_use]
pub fn validate_pac_settings(pac_settings: &PACSettings, path: &str) -> Vec<FieldError> {
    let mut errs = Vec::new();

    if let Some(values) = &pac_settings.settings {
        let settings_path = format!("{path}.settings");
        errs.extend(
            settings::validate(values)
                .into_iter()
                .map(|e| FieldError::new(settings_path.clone(), e.to_string())),
        );
    }

    let controllers_path = format!("{path}.additionalPACControllers");
    for (name, controller) in pac_settings.additional_pac_controllers.iter().flatten() {
        if let Err(message) = validate_controller_name(name) {
            errs.push(FieldError::new(controllers_path.clone(), message));
        }
        errs.extend(validate_additional_controller(
            controller,
            &format!("{controllers_path}[{name}]"),
        ));
    }

    errs
}

fn validate_additional_controller(
    controller: &AdditionalPACControllerConfig,
    path: &str,
) -> Vec<FieldError> {
    let mut errs = Vec::new();

    if !controller.config_map_name.is_empty() {
        if let Err(message) = validate_name(&controller.config_map_name, DNS1123_LABEL_MAX_LENGTH) {
            errs.push(FieldError::new(format!("{path}.configMapName"), message));
        }
    }
    if !controller.secret_name.is_empty() {
        if let Err(message) = validate_name(&controller.secret_name, DNS1123_LABEL_MAX_LENGTH) {
            errs.push(FieldError::new(format!("{path}.secretName"), message));
        }
    }
    if let Some(values) = &controller.settings {
        let settings_path = format!("{path}.settings");
        errs.extend(
            settings::validate(values)
                .into_iter()
                .map(|e| FieldError::new(settings_path.clone(), e.to_string())),
        );
    }

    errs
}

/// Check an additional controller name: DNS-1123 subdomain of at most 25 characters.
///
/// # Errors
///
/// Returns the violation message when the name is malformed or too long.
pub fn validate_controller_name(name: &str) -> Result<(), String> {
    validate_name(name, ADDITIONAL_CONTROLLER_NAME_MAX_LENGTH)
}

fn validate_name(name: &str, max_length: usize) -> Result<(), String> {
    if !is_dns1123_subdomain(name) {
        return Err(format!(
            "invalid resource name {name:?}: must be a valid DNS label"
        ));
    }
    if name.len() > max_length {
        return Err(format!(
            "invalid resource name {name:?}: length must be no more than {max_length} characters"
        ));
    }
    Ok(())
}

/// RFC 1123 label: lowercase alphanumerics and `-`, alphanumeric at both ends, at most 63 characters.
#[must_use]
pub fn is_dns1123_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= DNS1123_LABEL_MAX_LENGTH
                && is_lower_alnum(*first)
                && is_lower_alnum(*last)
                && bytes.iter().all(|b| is_lower_alnum(*b) || *b == b'-')
        }
        _ => false,
    }
}

/// RFC 1123 subdomain: dot-separated labels, at most 253 characters.
#[must_use]
pub fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= DNS1123_SUBDOMAIN_MAX_LENGTH && value.split('.').all(is_dns1123_label)
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
