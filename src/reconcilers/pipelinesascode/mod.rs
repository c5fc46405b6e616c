// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `OpenShiftPipelinesAsCode` reconciliation.
//!
//! One pass walks these stages in order, stopping at the first one that
//! cannot complete:
//!
//! 1. name guard: only the singleton `pipelines-as-code` is managed
//! 2. defaulting and validation of the spec
//! 3. dependency check on the `TektonPipeline`
//! 4. extension pre-reconcile
//! 5. `main` installer set from the release manifest
//! 6. one `custom-<name>` installer set per enabled additional controller
//! 7. cleanup of installer sets for controllers no longer configured
//! 8. extension post-reconcile
//!
//! Failures come back three ways. A [`ReconcileEvent`] is returned as the
//! error and the controller requeues. An installer-set or post-reconcile
//! failure is recorded in status only and the pass returns `Ok`. Anything
//! else is returned as a hard error.
//!
//! ## Module Structure
//!
//! - [`orphans`] - garbage collection of additional-controller sets
//! - [`status_helpers`] - stage conditions and the aggregate `Ready`
//! - [`types`] - shared imports

pub mod orphans;
pub mod status_helpers;
pub mod types;

#[allow(clippy::wildcard_imports)]
use types::*;

use std::time::Duration;

use crate::constants::{ERROR_REQUEUE_DURATION_SECS, REQUEUE_WHEN_READY_SECS};
use crate::defaults::apply_defaults;
use crate::dependency::PipelineReadiness;
use crate::manifest::by_kind;
use crate::transform::{
    additional_controller_transform, filter_and_transform, MainTransformOptions,
};
use crate::validation::{format_errors, validate};
use orphans::{additional_controller_labels, cleanup_orphans, OrphanCleanupError};
use status_helpers::{
    initialize_conditions, is_ready, mark_additional_pac_controller_complete, mark_dependencies_installed,
    mark_dependency_installing, mark_dependency_missing, mark_installer_set_not_ready,
    mark_installer_set_ready, mark_not_ready, mark_post_reconciler_complete,
    mark_post_reconciler_failed, mark_pre_reconciler_complete,
};

/// Reconcile one `OpenShiftPipelinesAsCode`.
///
/// The resource's status is rewritten in place; persisting it is left to the
/// caller.
///
/// # Errors
///
/// Returns a [`ReconcileEvent`] when the pass should simply be retried,
/// a [`DependencyError`] when Tekton Pipelines is not installed, and any
/// pre-reconcile or orphan cleanup failure.
pub async fn reconcile_pipelinesascode(ctx: &Context, pac: &mut OpenShiftPipelinesAsCode) -> Result<()> {
    let mut status = pac.status.take().unwrap_or_default();

    initialize_conditions(&mut status);
    status.version = Some(ctx.version.clone());
    status.observed_generation = pac.metadata.generation;

    let result = reconcile_stages(ctx, pac, &mut status).await;
    pac.status = Some(status);
    result
}

async fn reconcile_stages(
    ctx: &Context,
    pac: &OpenShiftPipelinesAsCode,
    status: &mut OpenShiftPipelinesAsCodeStatus,
) -> Result<()> {
    let name = pac.name_any();

    if name != OPENSHIFT_PIPELINES_AS_CODE_NAME {
        let msg = format!(
            "Resource ignored, Expected Name: {OPENSHIFT_PIPELINES_AS_CODE_NAME}, Got Name: {name}"
        );
        error!(name = %name, "{msg}");
        mark_not_ready(status, &msg);
        return Ok(());
    }

    info!(name = %name, version = %ctx.version, "Reconciling OpenShiftPipelinesAsCode");

    let mut owner = pac.clone();
    owner.spec = apply_defaults(&pac.spec);

    let field_errors = validate(&owner);
    if !field_errors.is_empty() {
        let msg = format_errors(&field_errors);
        warn!(name = %name, errors = field_errors.len(), "Invalid OpenShiftPipelinesAsCode spec: {msg}");
        mark_not_ready(status, &msg);
        return Ok(());
    }

    check_dependencies(ctx, status).await?;

    ctx.extension.pre_reconcile(&owner).await?;
    mark_pre_reconciler_complete(status);

    if !install_main_set(ctx, &owner, status).await? {
        return Ok(());
    }

    if !install_additional_sets(ctx, &owner, status).await? {
        return Ok(());
    }

    if !cleanup_additional_sets(ctx, &owner, status).await? {
        return Ok(());
    }
    mark_additional_pac_controller_complete(status);

    if let Err(e) = ctx.extension.post_reconcile(&owner).await {
        let msg = format!("PostReconciliation failed: {e:#}");
        if is_requeue_event(&e) {
            debug!(name = %name, "{msg}");
            return Err(e);
        }
        error!(name = %name, "{msg}");
        mark_post_reconciler_failed(status, &msg);
        return Ok(());
    }

    mark_post_reconciler_complete(status);
    info!(name = %name, "OpenShiftPipelinesAsCode reconciled");
    Ok(())
}

/// Interval before the next periodic pass after a successful one.
#[must_use]
pub fn requeue_interval(status: Option<&OpenShiftPipelinesAsCodeStatus>) -> Duration {
    if status.is_some_and(is_ready) {
        Duration::from_secs(REQUEUE_WHEN_READY_SECS)
    } else {
        Duration::from_secs(ERROR_REQUEUE_DURATION_SECS)
    }
}

/// Requeue while Tekton Pipelines installs; fail when it is absent.
async fn check_dependencies(ctx: &Context, status: &mut OpenShiftPipelinesAsCodeStatus) -> Result<()> {
    match ctx.dependency.pipeline_ready().await? {
        PipelineReadiness::Ready => {
            mark_dependencies_installed(status);
            Ok(())
        }
        PipelineReadiness::Installing | PipelineReadiness::UpgradePending => {
            mark_dependency_installing(status, "tekton-pipelines is still installing");
            debug!("waiting for TektonPipeline to become ready");
            Err(ReconcileEvent::requeue_after_default().into())
        }
        PipelineReadiness::Missing => {
            mark_dependency_missing(status, "tekton-pipelines does not exist");
            Err(DependencyError::Missing {
                kind: KIND_TEKTON_PIPELINE.to_string(),
                name: TEKTON_PIPELINE_NAME.to_string(),
            }
            .into())
        }
    }
}

/// Route an installer-set failure: requeue events propagate, anything else
/// is recorded in status and ends the pass.
fn installer_set_failure(
    err: anyhow::Error,
    msg: &str,
    status: &mut OpenShiftPipelinesAsCodeStatus,
) -> Result<bool> {
    if is_requeue_event(&err) {
        debug!("{msg}");
        return Err(err);
    }
    error!("{msg}");
    mark_installer_set_not_ready(status, msg);
    Ok(false)
}

/// Returns `Ok(false)` when the pass should stop without an error.
async fn install_main_set(
    ctx: &Context,
    owner: &OpenShiftPipelinesAsCode,
    status: &mut OpenShiftPipelinesAsCodeStatus,
) -> Result<bool> {
    let options = MainTransformOptions {
        target_namespace: if owner.spec.target_namespace.is_empty() {
            ctx.operator_namespace.clone()
        } else {
            owner.spec.target_namespace.clone()
        },
        settings: owner.spec.pac_settings.settings.clone().unwrap_or_default(),
        images: ctx.images.clone(),
        config: owner.spec.config.clone(),
    };
    let extension_transformers = ctx.extension.transformers(owner);
    let transform =
        move |m: &Manifest| filter_and_transform(m, &options, extension_transformers.clone());

    match ctx.installer_sets.main_set(owner, &ctx.manifest, &transform).await {
        Ok(set_name) => {
            status
                .installer_set_names
                .insert(INSTALLER_TYPE_MAIN.to_string(), set_name);
            mark_installer_set_ready(status);
            Ok(true)
        }
        Err(e) => {
            let msg = format!("Main Reconcilation failed: {e:#}");
            installer_set_failure(e, &msg, status)
        }
    }
}

/// Install every enabled additional controller, in name order, stopping at
/// the first failure.
async fn install_additional_sets(
    ctx: &Context,
    owner: &OpenShiftPipelinesAsCode,
    status: &mut OpenShiftPipelinesAsCodeStatus,
) -> Result<bool> {
    let Some(controllers) = owner.spec.pac_settings.additional_pac_controllers.as_ref() else {
        return Ok(true);
    };
    let labels = additional_controller_labels();

    for (name, config) in controllers {
        if !config.is_enabled() {
            debug!(name = %name, "additional controller disabled, skipping");
            continue;
        }

        // The shared ConfigMap belongs to the main set
        let manifest = if config.config_map_name == PIPELINES_AS_CODE_CONFIGMAP {
            ctx.additional_manifest.filter(&by_kind("ConfigMap").not())
        } else {
            ctx.additional_manifest.clone()
        };

        let config = config.clone();
        let controller = name.clone();
        let namespace = ctx.operator_namespace.clone();
        let extension_transformers = ctx.extension.transformers(owner);
        let transform = move |m: &Manifest| {
            additional_controller_transform(
                m,
                &config,
                &controller,
                &namespace,
                extension_transformers.clone(),
            )
        };

        match ctx
            .installer_sets
            .custom_set(owner, name, &manifest, &transform, &labels)
            .await
        {
            Ok(set_name) => {
                status
                    .installer_set_names
                    .insert(custom_set_type(name), set_name);
            }
            Err(e) => {
                let msg = format!("Additional PACController {name} Reconciliation failed: {e:#}");
                return installer_set_failure(e, &msg, status);
            }
        }
    }

    Ok(true)
}

/// Delete sets of additional controllers that are gone from the spec.
async fn cleanup_additional_sets(
    ctx: &Context,
    owner: &OpenShiftPipelinesAsCode,
    status: &mut OpenShiftPipelinesAsCodeStatus,
) -> Result<bool> {
    let desired = owner
        .spec
        .pac_settings
        .additional_pac_controllers
        .clone()
        .unwrap_or_default();

    match cleanup_orphans(ctx.installer_sets.as_ref(), &desired, status).await {
        Ok(cleaned) => {
            if !cleaned.is_empty() {
                info!(count = cleaned.len(), "removed obsolete additional controllers");
            }
            Ok(true)
        }
        Err(OrphanCleanupError::List(e)) => {
            let msg = format!("Additional PACController Reconciliation failed: {e:#}");
            installer_set_failure(e, &msg, status)
        }
        Err(OrphanCleanupError::Cleanup { name, error }) => {
            error!(name = %name, "failed to clean up additional controller: {error:#}");
            Err(error)
        }
    }
}
