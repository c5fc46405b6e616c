// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every option can be given as a flag or through its environment variable,
//! which is how the operator is configured when it runs in a pod.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::constants::{DEFAULT_OPERATOR_NAMESPACE, PAC_IMAGE_PREFIX};
use crate::errors::ConfigError;
use crate::manifest::Manifest;
use crate::transform::images_from_env;

/// Default location of the Pipelines-as-Code release manifest in the operator image.
pub const DEFAULT_MANIFEST_PATH: &str = "/var/run/ko/static/tekton-addon/pipelines-as-code";

/// Default bind address of the metrics endpoint.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9090";

#[derive(Parser, Debug, Clone)]
#[command(name = "pac-operator", version, about = "Pipelines-as-Code operator", long_about = None)]
pub struct OperatorConfig {
    /// Release version stamped on installer sets and status
    #[arg(id = "version_tag", long = "version-tag", env = "VERSION")]
    pub version: String,

    /// Pipelines-as-Code release manifest, a file or a directory of YAML files
    #[arg(long, env = "PAC_MANIFEST_PATH", default_value = DEFAULT_MANIFEST_PATH)]
    pub manifest_path: PathBuf,

    /// Separate manifest for additional controllers
    #[arg(long, env = "PAC_ADDITIONAL_MANIFEST_PATH")]
    pub additional_manifest_path: Option<PathBuf>,

    /// Manifest installed before the main installer set
    #[arg(long, env = "PAC_PRE_MANIFEST_PATH")]
    pub pre_manifest_path: Option<PathBuf>,

    /// Manifest installed after every installer set is ready
    #[arg(long, env = "PAC_POST_MANIFEST_PATH")]
    pub post_manifest_path: Option<PathBuf>,

    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Apply installer-set manifests in-process instead of relying on the Tekton operator
    #[arg(long, env = "PAC_APPLY_INSTALLER_SETS")]
    pub apply_installer_sets: bool,

    /// Namespace the operator and additional controllers run in
    #[arg(long, env = "OPERATOR_NAMESPACE", default_value = DEFAULT_OPERATOR_NAMESPACE)]
    pub operator_namespace: String,
}

impl OperatorConfig {
    /// Check values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty version or a missing manifest path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }

        let paths = std::iter::once(&self.manifest_path)
            .chain(self.additional_manifest_path.iter())
            .chain(self.pre_manifest_path.iter())
            .chain(self.post_manifest_path.iter());
        for path in paths {
            if !path.exists() {
                return Err(ConfigError::ManifestPathNotFound(path.clone()));
            }
        }

        Ok(())
    }

    /// Load the release manifest.
    ///
    /// # Errors
    ///
    /// Returns the loading failure.
    pub fn load_manifest(&self) -> anyhow::Result<Manifest> {
        Ok(Manifest::from_path(&self.manifest_path)?)
    }

    /// Load an optional manifest, `None` when its path is unset.
    ///
    /// # Errors
    ///
    /// Returns the loading failure.
    pub fn load_optional(path: Option<&PathBuf>) -> anyhow::Result<Option<Manifest>> {
        path.map(|p| Manifest::from_path(p).map_err(anyhow::Error::from))
            .transpose()
    }

    /// Container image overrides from `IMAGE_PAC_*` variables.
    #[must_use]
    pub fn images() -> BTreeMap<String, String> {
        images_from_env(PAC_IMAGE_PREFIX)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
