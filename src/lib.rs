// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # pac-operator - Pipelines-as-Code Operator for Kubernetes
//!
//! Installs OpenShift Pipelines-as-Code from its release manifest and runs any
//! number of additional Pipelines-as-Code controllers side by side, each
//! carried in its own `TektonInstallerSet`.
//!
//! ## Overview
//!
//! A single cluster-scoped `OpenShiftPipelinesAsCode` named
//! `pipelines-as-code` drives everything. Each reconcile pass defaults and
//! validates its spec, waits for Tekton Pipelines, renders the release
//! manifest into a `main` installer set, renders one `custom-<name>` set per
//! enabled additional controller, and deletes the sets of controllers that
//! were removed from the spec.
//!
//! ## Modules
//!
//! - [`crd`] - `OpenShiftPipelinesAsCode` and `TektonInstallerSet` resources
//! - [`defaults`] / [`validation`] - spec defaulting and validation
//! - [`settings`] - Pipelines-as-Code settings defaults and value checks
//! - [`manifest`] / [`transform`] - manifest loading and rendering
//! - [`installerset`] - installer-set lifecycle against the API server
//! - [`dependency`] - Tekton Pipelines readiness
//! - [`extension`] - platform hooks around a reconcile pass
//! - [`reconcilers`] - the reconcile state machine and status handling
//! - [`config`] - operator command line and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use pac_operator::crd::{OpenShiftPipelinesAsCode, OpenShiftPipelinesAsCodeSpec};
//! use pac_operator::defaults::apply_defaults;
//! use pac_operator::validation::validate;
//!
//! let mut pac = OpenShiftPipelinesAsCode::new(
//!     "pipelines-as-code",
//!     OpenShiftPipelinesAsCodeSpec::default(),
//! );
//! pac.spec = apply_defaults(&pac.spec);
//! assert!(validate(&pac).is_empty());
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod defaults;
pub mod dependency;
pub mod errors;
pub mod extension;
pub mod installerset;
pub mod labels;
pub mod manifest;
pub mod metrics;
pub mod reconcilers;
pub mod settings;
pub mod transform;
pub mod validation;

#[cfg(test)]
mod testdata;
