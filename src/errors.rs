// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the Pipelines-as-Code operator.
//!
//! This module provides:
//! - [`ReconcileEvent`] - non-failure signals asking the controller to run the
//!   reconciler again (after a delay, or right away)
//! - [`ManifestError`] - failures loading release manifests from disk
//! - [`TransformError`] - failures rewriting a rendered resource
//! - [`DependencyError`] - a prerequisite component is absent
//! - [`ConfigError`] - invalid operator configuration at startup
//!
//! Reconcilers return [`anyhow::Result`]; the sentinels are recovered with
//! [`is_requeue_event`] and [`requeue_delay`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::constants::REQUEUE_WHEN_NOT_READY_SECS;

/// Signals that a reconcile pass should be retried without being treated as a failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A precondition is not met yet; retry after the given delay.
    #[error("requeue after {0:?}")]
    RequeueAfter(Duration),

    /// Stale state was removed; run the reconciler again immediately.
    #[error("reconcile again")]
    ReconcileAgain,
}

impl ReconcileEvent {
    /// The default requeue-after event used while waiting on a dependency.
    #[must_use]
    pub fn requeue_after_default() -> Self {
        Self::RequeueAfter(Duration::from_secs(REQUEUE_WHEN_NOT_READY_SECS))
    }

    /// Delay the controller should wait before the next pass.
    #[must_use]
    pub fn delay(&self) -> Duration {
        match self {
            Self::RequeueAfter(delay) => *delay,
            Self::ReconcileAgain => Duration::ZERO,
        }
    }

    /// Short label used for metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RequeueAfter(_) => "requeue_after",
            Self::ReconcileAgain => "reconcile_again",
        }
    }
}

/// Returns `true` if the error chain carries a [`ReconcileEvent`].
#[must_use]
pub fn is_requeue_event(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ReconcileEvent>().is_some()
}

/// Returns the requeue delay carried by the error, if it is a [`ReconcileEvent`].
#[must_use]
pub fn requeue_delay(err: &anyhow::Error) -> Option<Duration> {
    err.downcast_ref::<ReconcileEvent>().map(ReconcileEvent::delay)
}

/// Errors that can occur while loading release manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// A manifest file or directory could not be read
    #[error("failed to read manifest '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A YAML document could not be decoded into a Kubernetes object
    #[error("failed to parse manifest '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised by resource transformers.
///
/// Any of these aborts the whole pipeline for the manifest being rendered.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Converting the generic object into its typed view failed
    #[error("failed to decode {kind} '{name}': {source}")]
    Decode {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Converting the typed view back into the generic object failed
    #[error("failed to encode {kind} '{name}': {source}")]
    Encode {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A field the transformer rewrites is absent from the resource
    #[error("{kind} '{name}' has no {field}")]
    MissingField {
        kind: String,
        name: String,
        field: &'static str,
    },

    /// A field exists but does not have the expected shape
    #[error("{kind} '{name}' field {field} is not {expected}")]
    InvalidField {
        kind: String,
        name: String,
        field: &'static str,
        expected: &'static str,
    },
}

/// A prerequisite component the operator depends on is not installed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("{kind} '{name}' does not exist")]
    Missing { kind: String, name: String },
}

/// Invalid operator configuration detected at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("manifest path '{}' does not exist", .0.display())]
    ManifestPathNotFound(PathBuf),

    #[error("release version must not be empty")]
    EmptyVersion,
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
