// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use pac_operator::{
    config::OperatorConfig,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_OPENSHIFT_PIPELINES_AS_CODE, KIND_TEKTON_INSTALLER_SET,
        REQUEUE_WHEN_READY_SECS,
    },
    context::Context,
    crd::{OpenShiftPipelinesAsCode, TektonInstallerSet},
    dependency::KubePipelineReadiness,
    errors::ReconcileEvent,
    extension::OpenShiftExtension,
    installerset::KubeInstallerSetClient,
    labels::CREATED_BY_KEY,
    metrics,
    reconcilers::{
        pipelinesascode::requeue_interval, reconcile_pipelinesascode,
        reconcile_tektoninstallerset, status::PipelinesAsCodeStatusUpdater,
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// State shared by every reconcile pass.
struct State {
    client: Client,
    ctx: Context,
}

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("pac-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    // Respects RUST_LOG, defaulting to INFO, and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!(version = %config.version, "Starting Pipelines-as-Code operator");

    config.validate()?;

    let manifest = config.load_manifest()?;
    let additional_manifest = OperatorConfig::load_optional(config.additional_manifest_path.as_ref())?;
    let pre_manifest = OperatorConfig::load_optional(config.pre_manifest_path.as_ref())?;
    let post_manifest = OperatorConfig::load_optional(config.post_manifest_path.as_ref())?;
    info!(
        path = %config.manifest_path.display(),
        resources = manifest.len(),
        "Loaded release manifest"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let installer_sets = Arc::new(KubeInstallerSetClient::new(
        client.clone(),
        &config.version,
        &config.operator_namespace,
    ));
    let dependency = Arc::new(KubePipelineReadiness::new(client.clone()));
    let extension = Arc::new(OpenShiftExtension::new(
        installer_sets.clone(),
        pre_manifest,
        post_manifest,
        &config.operator_namespace,
    ));

    let mut ctx = Context::new(
        installer_sets,
        dependency,
        extension,
        manifest,
        &config.version,
        &config.operator_namespace,
    )
    .with_images(OperatorConfig::images());
    if let Some(additional) = additional_manifest {
        ctx = ctx.with_additional_manifest(additional);
    }

    let state = Arc::new(State {
        client: client.clone(),
        ctx,
    });

    let applier = async {
        if config.apply_installer_sets {
            run_tektoninstallerset_controller(client).await
        } else {
            debug!("TektonInstallerSet applier disabled");
            std::future::pending().await
        }
    };

    tokio::select! {
        result = run_pipelinesascode_controller(state) => {
            info!("OpenShiftPipelinesAsCode controller stopped");
            result
        }
        result = applier => {
            info!("TektonInstallerSet controller stopped");
            result
        }
        result = run_metrics_server(config.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// Run the `OpenShiftPipelinesAsCode` controller until a shutdown signal arrives
async fn run_pipelinesascode_controller(state: Arc<State>) -> Result<()> {
    info!("Starting OpenShiftPipelinesAsCode controller");

    let api = Api::<OpenShiftPipelinesAsCode>::all(state.client.clone());
    let installer_sets = Api::<TektonInstallerSet>::all(state.client.clone());

    Controller::new(api, Config::default())
        .owns(installer_sets, Config::default())
        .shutdown_on_signal()
        .run(reconcile_pipelinesascode_wrapper, error_policy, state)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `TektonInstallerSet` applier over the sets this operator created
async fn run_tektoninstallerset_controller(client: Client) -> Result<()> {
    info!("Starting TektonInstallerSet controller");

    let api = Api::<TektonInstallerSet>::all(client.clone());
    let selector = format!("{CREATED_BY_KEY}={KIND_OPENSHIFT_PIPELINES_AS_CODE}");

    Controller::new(api, Config::default().labels(&selector))
        .shutdown_on_signal()
        .run(
            reconcile_tektoninstallerset_wrapper,
            error_policy_installer_set,
            Arc::new(client),
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `TektonInstallerSet`
async fn reconcile_tektoninstallerset_wrapper(
    set: Arc<TektonInstallerSet>,
    client: Arc<Client>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();

    match reconcile_tektoninstallerset((*client).clone(), (*set).clone()).await {
        Ok(()) => {
            metrics::record_reconciliation_success(KIND_TEKTON_INSTALLER_SET, start.elapsed());
            Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)))
        }
        Err(e) => {
            error!(name = %set.name_any(), "Failed to apply TektonInstallerSet: {e:#}");
            metrics::record_reconciliation_error(KIND_TEKTON_INSTALLER_SET, start.elapsed());
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `OpenShiftPipelinesAsCode`
async fn reconcile_pipelinesascode_wrapper(
    pac: Arc<OpenShiftPipelinesAsCode>,
    state: Arc<State>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    debug!(name = %pac.name_any(), "Reconcile wrapper called for OpenShiftPipelinesAsCode");

    let updater = PipelinesAsCodeStatusUpdater::new(&pac);
    let mut resource = (*pac).clone();
    let result = reconcile_pipelinesascode(&state.ctx, &mut resource).await;

    let status_result = match resource.status.as_ref() {
        Some(status) => updater.apply(&state.client, status).await,
        None => Ok(()),
    };

    match result {
        Ok(()) => {
            if let Err(e) = status_result {
                error!(name = %pac.name_any(), "Failed to update OpenShiftPipelinesAsCode status: {e:#}");
                metrics::record_reconciliation_error(KIND_OPENSHIFT_PIPELINES_AS_CODE, start.elapsed());
                return Err(e.into());
            }

            metrics::record_reconciliation_success(KIND_OPENSHIFT_PIPELINES_AS_CODE, start.elapsed());
            let interval = requeue_interval(resource.status.as_ref());
            info!(
                name = %pac.name_any(),
                requeue_secs = interval.as_secs(),
                "Successfully reconciled OpenShiftPipelinesAsCode"
            );
            Ok(Action::requeue(interval))
        }
        Err(e) => {
            if let Err(status_err) = status_result {
                warn!(name = %pac.name_any(), "Failed to update OpenShiftPipelinesAsCode status: {status_err:#}");
            }

            if let Some(event) = e.downcast_ref::<ReconcileEvent>() {
                info!(name = %pac.name_any(), reason = event.reason(), "Requeueing OpenShiftPipelinesAsCode");
                metrics::record_reconciliation_requeue(KIND_OPENSHIFT_PIPELINES_AS_CODE, event.reason());
                return Ok(Action::requeue(event.delay()));
            }

            error!(name = %pac.name_any(), "Failed to reconcile OpenShiftPipelinesAsCode: {e:#}");
            metrics::record_reconciliation_error(KIND_OPENSHIFT_PIPELINES_AS_CODE, start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for controller
fn error_policy(
    _resource: Arc<OpenShiftPipelinesAsCode>,
    _err: &ReconcileError,
    _state: Arc<State>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Error policy for `TektonInstallerSet` controller
fn error_policy_installer_set(
    _resource: Arc<TektonInstallerSet>,
    _err: &ReconcileError,
    _client: Arc<Client>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Serve the Prometheus registry at `GET /metrics`
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(addr = %addr, "Starting metrics server");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
