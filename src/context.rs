// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `OpenShiftPipelinesAsCode` reconciler.
//!
//! The context is built once at startup and shared by every reconcile pass:
//! - collaborators behind traits (installer sets, dependency readiness,
//!   platform extension)
//! - release manifests parsed once and never mutated
//! - release version, operator namespace and image overrides

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dependency::DependencyReadiness;
use crate::extension::Extension;
use crate::installerset::InstallerSetClient;
use crate::manifest::Manifest;
use crate::transform::filter_additional_controller_manifest;

/// Everything a reconcile pass needs besides the resource itself.
#[derive(Clone)]
pub struct Context {
    pub installer_sets: Arc<dyn InstallerSetClient>,
    pub dependency: Arc<dyn DependencyReadiness>,
    pub extension: Arc<dyn Extension>,

    /// Primary release manifest
    pub manifest: Manifest,

    /// Source of every additional controller
    pub additional_manifest: Manifest,

    /// Release version stamped on status and installer sets
    pub version: String,

    /// Namespace additional controllers are installed into
    pub operator_namespace: String,

    /// Container image overrides keyed by lower-cased container name
    pub images: BTreeMap<String, String>,
}

impl Context {
    /// Build a context whose additional-controller manifest is derived from
    /// the primary one.
    #[must_use]
    pub fn new(
        installer_sets: Arc<dyn InstallerSetClient>,
        dependency: Arc<dyn DependencyReadiness>,
        extension: Arc<dyn Extension>,
        manifest: Manifest,
        version: &str,
        operator_namespace: &str,
    ) -> Self {
        let additional_manifest = filter_additional_controller_manifest(&manifest);
        Self {
            installer_sets,
            dependency,
            extension,
            manifest,
            additional_manifest,
            version: version.to_string(),
            operator_namespace: operator_namespace.to_string(),
            images: BTreeMap::new(),
        }
    }

    /// Use a separately loaded manifest for additional controllers.
    #[must_use]
    pub fn with_additional_manifest(mut self, manifest: Manifest) -> Self {
        self.additional_manifest = manifest;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: BTreeMap<String, String>) -> Self {
        self.images = images;
        self
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
