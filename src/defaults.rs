// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Defaulting for `OpenShiftPipelinesAsCode` resources.
//!
//! Defaulting is total and idempotent: it never fails and running it on an
//! already-defaulted spec changes nothing. Values the user set are never
//! overwritten.

use std::collections::BTreeMap;

use crate::constants::{
    ADDITIONAL_CONTROLLER_CONFIGMAP_SUFFIX, ADDITIONAL_CONTROLLER_SECRET_SUFFIX,
};
use crate::crd::{AdditionalPACControllerConfig, OpenShiftPipelinesAsCodeSpec, PACSettings};
use crate::settings;

impl OpenShiftPipelinesAsCodeSpec {
    /// Apply defaults to the spec in place.
    pub fn set_defaults(&mut self) {
        self.pac_settings.set_defaults();
    }
}

impl PACSettings {
    /// Initialize both maps and fill in settings and per-controller defaults.
    pub fn set_defaults(&mut self) {
        settings::set_defaults(self.settings.get_or_insert_with(BTreeMap::new));

        for (name, controller) in self
            .additional_pac_controllers
            .get_or_insert_with(BTreeMap::new)
            .iter_mut()
        {
            controller.set_defaults(name);
        }
    }
}

impl AdditionalPACControllerConfig {
    /// Fill in defaults for the controller registered under `name`.
    pub fn set_defaults(&mut self, name: &str) {
        settings::set_defaults(self.settings.get_or_insert_with(BTreeMap::new));

        if self.enable.is_none() {
            self.enable = Some(true);
        }
        if self.config_map_name.is_empty() {
            self.config_map_name = format!("{name}{ADDITIONAL_CONTROLLER_CONFIGMAP_SUFFIX}");
        }
        if self.secret_name.is_empty() {
            self.secret_name = format!("{name}{ADDITIONAL_CONTROLLER_SECRET_SUFFIX}");
        }
    }
}

/// Return a defaulted copy of `spec`.
#[must_use]
pub fn apply_defaults(spec: &OpenShiftPipelinesAsCodeSpec) -> OpenShiftPipelinesAsCodeSpec {
    let mut defaulted = spec.clone();
    defaulted.set_defaults();
    defaulted
}

#[cfg(test)]
#[path = "defaults_tests.rs"]
mod defaults_tests;
