// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared types and imports for `OpenShiftPipelinesAsCode` reconciliation.

#![allow(clippy::wildcard_imports)]

pub use crate::constants::{
    KIND_OPENSHIFT_PIPELINES_AS_CODE, KIND_TEKTON_PIPELINE, OPENSHIFT_PIPELINES_AS_CODE_NAME,
    PIPELINES_AS_CODE_CONFIGMAP, TEKTON_PIPELINE_NAME,
};
pub use crate::context::Context;
pub use crate::crd::{
    AdditionalPACControllerConfig, Condition, OpenShiftPipelinesAsCode,
    OpenShiftPipelinesAsCodeStatus, TektonInstallerSet,
};
pub use crate::errors::{is_requeue_event, DependencyError, ReconcileEvent};
pub use crate::labels::{
    custom_set_type, ADDITIONAL_CONTROLLER_NAME_KEY, ADDITIONAL_PAC_CONTROLLER_COMPONENT,
    COMPONENT_KEY, CREATED_BY_KEY, INSTALLER_SET_TYPE_KEY, INSTALLER_TYPE_MAIN,
};
pub use crate::manifest::Manifest;
pub use crate::reconcilers::status::{
    find_condition, is_condition_true, update_condition_in_memory, STATUS_FALSE, STATUS_TRUE,
    STATUS_UNKNOWN,
};

pub use anyhow::Result;
pub use kube::ResourceExt;
pub use std::collections::BTreeMap;
pub use tracing::{debug, error, info, warn};
