// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Readiness of the Tekton Pipelines installation Pipelines-as-Code runs on.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde_json::Value;
use tracing::debug;

use crate::constants::{
    API_GROUP, API_VERSION, KIND_TEKTON_PIPELINE, PLURAL_TEKTON_PIPELINE, TEKTON_PIPELINE_NAME,
};
use crate::reconcilers::retry::{is_not_found, retry_api_call};

/// Marker the pipeline operator puts in its `Ready` message while an upgrade
/// waits on other components.
pub const UPGRADE_PENDING: &str = "upgrade pending";

/// State of the prerequisite `TektonPipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineReadiness {
    Ready,
    /// Exists but is not ready yet
    Installing,
    /// Exists, waiting on an operator upgrade
    UpgradePending,
    /// No `TektonPipeline` instance exists
    Missing,
}

/// Answers whether Tekton Pipelines is installed and ready.
#[async_trait]
pub trait DependencyReadiness: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if readiness could not be determined.
    async fn pipeline_ready(&self) -> Result<PipelineReadiness>;
}

/// Derive readiness from a `TektonPipeline` object.
#[must_use]
pub fn readiness_from_object(pipeline: &DynamicObject) -> PipelineReadiness {
    let ready = pipeline
        .data
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|c| c.get("type").and_then(Value::as_str) == Some("Ready"))
        });

    let Some(ready) = ready else {
        return PipelineReadiness::Installing;
    };

    let message = ready.get("message").and_then(Value::as_str).unwrap_or_default();
    if message.contains(UPGRADE_PENDING) {
        return PipelineReadiness::UpgradePending;
    }

    if ready.get("status").and_then(Value::as_str) == Some("True") {
        PipelineReadiness::Ready
    } else {
        PipelineReadiness::Installing
    }
}

/// Reads the cluster-scoped `TektonPipeline` named `pipeline`.
#[derive(Clone)]
pub struct KubePipelineReadiness {
    api: Api<DynamicObject>,
}

impl KubePipelineReadiness {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk(API_GROUP, API_VERSION, KIND_TEKTON_PIPELINE);
        let resource = ApiResource::from_gvk_with_plural(&gvk, PLURAL_TEKTON_PIPELINE);
        Self {
            api: Api::all_with(client, &resource),
        }
    }
}

#[async_trait]
impl DependencyReadiness for KubePipelineReadiness {
    async fn pipeline_ready(&self) -> Result<PipelineReadiness> {
        match retry_api_call(|| self.api.get(TEKTON_PIPELINE_NAME), "get TektonPipeline").await {
            Ok(pipeline) => {
                let readiness = readiness_from_object(&pipeline);
                debug!(?readiness, "TektonPipeline readiness");
                Ok(readiness)
            }
            Err(e) if is_not_found(&e) => Ok(PipelineReadiness::Missing),
            Err(e) => Err(e).context("failed to read TektonPipeline"),
        }
    }
}
