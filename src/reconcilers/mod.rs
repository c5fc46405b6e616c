// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for Pipelines-as-Code.
//!
//! The operator follows the standard controller pattern:
//!
//! 1. **Watch** - `OpenShiftPipelinesAsCode` and the `TektonInstallerSet`s it owns
//! 2. **Reconcile** - render the release manifests and converge the installer sets
//! 3. **Status** - report stage conditions back on the custom resource
//!
//! # Available Reconcilers
//!
//! - [`reconcile_pipelinesascode`] - one full pass over an `OpenShiftPipelinesAsCode`
//! - [`reconcile_tektoninstallerset`] - optional applier for the installer sets it creates
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use pac_operator::context::Context;
//! use pac_operator::crd::OpenShiftPipelinesAsCode;
//! use pac_operator::reconcilers::reconcile_pipelinesascode;
//!
//! async fn reconcile(ctx: &Context, mut pac: OpenShiftPipelinesAsCode) -> anyhow::Result<()> {
//!     reconcile_pipelinesascode(ctx, &mut pac).await?;
//!     Ok(())
//! }
//! ```

pub mod pipelinesascode;
pub mod retry;
pub mod status;
pub mod tektoninstallerset;

pub use pipelinesascode::reconcile_pipelinesascode;
pub use tektoninstallerset::reconcile_tektoninstallerset;
