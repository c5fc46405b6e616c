// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pipelines-as-Code controller settings.
//!
//! The settings map is copied verbatim into the controller `ConfigMap`. This
//! module knows which keys the controller understands, the value each one
//! takes when the user leaves it out, and what values are acceptable.
//!
//! # Example
//!
//! ```rust
//! use pac_operator::settings::{set_defaults, validate};
//! use std::collections::BTreeMap;
//!
//! let mut settings = BTreeMap::new();
//! settings.insert("hub-catalog-name".to_string(), "custom".to_string());
//! set_defaults(&mut settings);
//!
//! assert_eq!(settings["hub-catalog-name"], "custom");
//! assert_eq!(settings["remote-tasks"], "true");
//! assert!(validate(&settings).is_empty());
//! ```

use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Accepted values for a settings key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    /// `true` or `false`
    Bool,
    /// A non-negative integer
    Count,
    /// An absolute `http` or `https` URL, or empty
    Url,
    /// A non-empty string
    NonEmpty,
    /// Any string, including empty
    Text,
}

/// A settings key the controller understands.
#[derive(Debug, Clone, Copy)]
pub struct SettingKey {
    pub name: &'static str,
    pub domain: ValueDomain,
    /// Value filled in when the key is absent. `None` leaves the key unset.
    pub default: Option<&'static str>,
}

const fn key(name: &'static str, domain: ValueDomain, default: Option<&'static str>) -> SettingKey {
    SettingKey {
        name,
        domain,
        default,
    }
}

/// Default regular expression used to pick errors out of container logs.
pub const DEFAULT_ERROR_DETECTION_REGEXP: &str =
    r"^(?P<filename>[^:]*):(?P<line>[0-9]+):(?P<column>[0-9]+):([ ]*)?(?P<error>.*)";

/// Every key the Pipelines-as-Code controller reads, sorted by name.
pub const KNOWN_SETTINGS: &[SettingKey] = &[
    key(
        "application-name",
        ValueDomain::NonEmpty,
        Some("Pipelines as Code CI"),
    ),
    key(
        "auto-configure-new-github-repo",
        ValueDomain::Bool,
        Some("false"),
    ),
    key("auto-configure-repo-namespace-template", ValueDomain::Text, None),
    key("bitbucket-cloud-additional-source-ip", ValueDomain::Text, None),
    key(
        "bitbucket-cloud-check-source-ip",
        ValueDomain::Bool,
        Some("true"),
    ),
    key("custom-console-name", ValueDomain::Text, Some("")),
    key("custom-console-url", ValueDomain::Url, Some("")),
    key("custom-console-url-namespace", ValueDomain::Text, None),
    key("custom-console-url-pr-details", ValueDomain::Text, Some("")),
    key("custom-console-url-pr-tasklog", ValueDomain::Text, Some("")),
    key("default-max-keep-runs", ValueDomain::Count, None),
    key(
        "error-detection-from-container-logs",
        ValueDomain::Bool,
        Some("false"),
    ),
    key(
        "error-detection-max-number-of-lines",
        ValueDomain::Count,
        Some("50"),
    ),
    key(
        "error-detection-simple-regexp",
        ValueDomain::NonEmpty,
        Some(DEFAULT_ERROR_DETECTION_REGEXP),
    ),
    key("error-log-snippet", ValueDomain::Bool, Some("true")),
    key("hub-catalog-name", ValueDomain::NonEmpty, Some("tekton")),
    key(
        "hub-url",
        ValueDomain::Url,
        Some("https://api.hub.tekton.dev/v1"),
    ),
    key("max-keep-run-upper-limit", ValueDomain::Count, None),
    key("remember-ok-to-test", ValueDomain::Bool, None),
    key("remote-tasks", ValueDomain::Bool, Some("true")),
    key("secret-auto-create", ValueDomain::Bool, Some("true")),
    key(
        "secret-github-app-scope-extra-repos",
        ValueDomain::Text,
        None,
    ),
    key(
        "secret-github-app-token-scoped",
        ValueDomain::Bool,
        Some("true"),
    ),
    key("tekton-dashboard-url", ValueDomain::Url, None),
];

/// A single invalid settings entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unknown setting '{key}'")]
    UnknownKey { key: String },

    #[error("invalid value '{value}' for setting '{key}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl SettingsError {
    /// The settings key the error refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::UnknownKey { key } | Self::InvalidValue { key, .. } => key,
        }
    }
}

/// Look up a known settings key.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static SettingKey> {
    KNOWN_SETTINGS
        .binary_search_by(|k| k.name.cmp(name))
        .ok()
        .map(|idx| &KNOWN_SETTINGS[idx])
}

/// Fill in defaults for every key the caller left out.
///
/// Keys already present are never overwritten, so calling this twice is a no-op.
pub fn set_defaults(settings: &mut BTreeMap<String, String>) {
    for setting in KNOWN_SETTINGS {
        if let Some(default) = setting.default {
            settings
                .entry(setting.name.to_string())
                .or_insert_with(|| default.to_string());
        }
    }
}

/// Validate every entry and return all violations found.
#[must_use]
pub fn validate(settings: &BTreeMap<String, String>) -> Vec<SettingsError> {
    settings
        .iter()
        .filter_map(|(key, value)| validate_entry(key, value).err())
        .collect()
}

fn validate_entry(key: &str, value: &str) -> Result<(), SettingsError> {
    let Some(setting) = lookup(key) else {
        return Err(SettingsError::UnknownKey {
            key: key.to_string(),
        });
    };

    let expected = match setting.domain {
        ValueDomain::Bool if value != "true" && value != "false" => Some("true or false"),
        ValueDomain::Count if value.parse::<u32>().is_err() => Some("a non-negative integer"),
        ValueDomain::Url if !value.is_empty() && !is_http_url(value) => {
            Some("an absolute http(s) URL")
        }
        ValueDomain::NonEmpty if value.trim().is_empty() => Some("a non-empty value"),
        _ => None,
    };

    match expected {
        Some(expected) => Err(SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }),
        None => Ok(()),
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod settings_tests;
