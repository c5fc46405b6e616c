// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource transformers for the Pipelines-as-Code manifests.
//!
//! Two pipelines are built here:
//!
//! - [`filter_and_transform`] renders the primary release manifest into the
//!   `main` installer set.
//! - [`additional_controller_transform`] renders one additional controller
//!   from [`filter_additional_controller_manifest`], renaming every resource
//!   to `<name>-controller` and pointing it at the entry's `ConfigMap` and `Secret`.
//!
//! Every transformer only touches objects of its own kind and only the fields
//! it owns, so transformers commute across resources.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::DynamicObject;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::constants::{
    ADDITIONAL_CONTROLLER_NAME_SUFFIX, ENV_PAC_CONTROLLER_CONFIGMAP, ENV_PAC_CONTROLLER_LABEL,
    ENV_PAC_CONTROLLER_SECRET, PIPELINES_AS_CODE_CONFIGMAP, PIPELINES_AS_CODE_CONTROLLER,
    PIPELINES_AS_CODE_CONTROLLER_MONITOR,
};
use crate::crd::{AdditionalPACControllerConfig, WorkloadConfig};
use crate::errors::TransformError;
use crate::labels::{
    APP_LABEL, K8S_NAME, OPERAND_NAME_KEY, OPERAND_OPENSHIFT_PIPELINES_AS_CODE, PAC_ROUTE_LABEL,
};
use crate::manifest::{
    by_kind, by_name, from_typed, kind_of, name_of, to_typed, Manifest, Predicate, Transformer,
};

/// Kinds that are never namespaced.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "ClusterInterceptor",
    "ClusterRole",
    "ClusterRoleBinding",
    "ConsoleCLIDownload",
    "ConsolePlugin",
    "ConsoleYAMLSample",
    "CustomResourceDefinition",
    "MutatingWebhookConfiguration",
    "Namespace",
    "PersistentVolume",
    "PriorityClass",
    "SecurityContextConstraints",
    "StorageClass",
    "ValidatingWebhookConfiguration",
];

/// Name every resource of an additional controller is given.
#[must_use]
pub fn additional_controller_name(name: &str) -> String {
    format!("{name}{ADDITIONAL_CONTROLLER_NAME_SUFFIX}")
}

// ============================================================================
// Pipelines
// ============================================================================

/// Inputs of the primary manifest pipeline.
#[derive(Debug, Clone, Default)]
pub struct MainTransformOptions {
    /// Namespace the primary components are installed into
    pub target_namespace: String,
    /// Top-level settings copied into the shared `ConfigMap`
    pub settings: BTreeMap<String, String>,
    /// Container image overrides keyed by lower-cased container name
    pub images: BTreeMap<String, String>,
    /// Scheduling applied to every `Deployment`
    pub config: WorkloadConfig,
}

/// Render the primary release manifest.
///
/// `Namespace` objects are dropped first: the installer set owns what it
/// applies, and deleting the owner must never cascade to the target namespace.
///
/// # Errors
///
/// Returns the first transformer failure.
pub fn filter_and_transform(
    manifest: &Manifest,
    options: &MainTransformOptions,
    extension_transformers: Vec<Transformer>,
) -> Result<Manifest, TransformError> {
    let filtered = manifest.filter(&by_kind("Namespace").not());

    let mut transformers = vec![
        inject_operand_name_label(OPERAND_OPENSHIFT_PIPELINES_AS_CODE),
        inject_namespace(&options.target_namespace),
        deployment_images(options.images.clone()),
        add_configuration(options.config.clone()),
        copy_config_map(PIPELINES_AS_CODE_CONFIGMAP, options.settings.clone()),
        update_service_monitor_target_namespace(&options.target_namespace),
    ];
    transformers.extend(extension_transformers);

    filtered.transform(&transformers)
}

/// Select the resources that make up one additional controller: the shared
/// `ConfigMap` plus the controller `Deployment`, `Service`, `ServiceMonitor` and `Route`.
#[must_use]
pub fn filter_additional_controller_manifest(manifest: &Manifest) -> Manifest {
    let select = |kind: &str, name: &str| {
        manifest.filter(&Predicate::all([by_kind(kind), by_name(name)]))
    };

    let config_map = select("ConfigMap", PIPELINES_AS_CODE_CONFIGMAP);
    let deployment = select("Deployment", PIPELINES_AS_CODE_CONTROLLER);
    let service = select("Service", PIPELINES_AS_CODE_CONTROLLER);
    let service_monitor = select("ServiceMonitor", PIPELINES_AS_CODE_CONTROLLER_MONITOR);
    let route = select("Route", PIPELINES_AS_CODE_CONTROLLER);

    config_map.append(&[&deployment, &service, &service_monitor, &route])
}

/// Render one additional controller named `name` into `namespace`.
///
/// # Errors
///
/// Returns the first transformer failure.
pub fn additional_controller_transform(
    manifest: &Manifest,
    config: &AdditionalPACControllerConfig,
    name: &str,
    namespace: &str,
    extension_transformers: Vec<Transformer>,
) -> Result<Manifest, TransformError> {
    let mut transformers = vec![
        inject_namespace(namespace),
        update_additional_controller_config_map(config),
        update_additional_controller_deployment(config, name),
        update_additional_controller_service(name),
        update_additional_controller_service_monitor(name, namespace),
        update_additional_controller_route(name),
    ];
    transformers.extend(extension_transformers);

    debug!(name, resources = manifest.len(), "rendering additional controller");
    manifest.transform(&transformers)
}

// ============================================================================
// Generic transformers
// ============================================================================

/// Set the namespace of every namespaced object, and of `ServiceAccount`
/// subjects of role bindings.
pub fn inject_namespace(namespace: &str) -> Transformer {
    let namespace = namespace.to_string();
    Arc::new(move |obj: &mut DynamicObject| {
        let kind = kind_of(obj).to_string();
        if matches!(kind.as_str(), "ClusterRoleBinding" | "RoleBinding") {
            if let Some(subjects) = obj.data.get_mut("subjects").and_then(Value::as_array_mut) {
                for subject in subjects.iter_mut().filter(|s| s["kind"] == "ServiceAccount") {
                    subject["namespace"] = Value::String(namespace.clone());
                }
            }
        }
        if !CLUSTER_SCOPED_KINDS.contains(&kind.as_str()) {
            obj.metadata.namespace = Some(namespace.clone());
        }
        Ok(())
    })
}

/// Set the operand-name label on every object, replacing any existing value.
pub fn inject_operand_name_label(operand: &str) -> Transformer {
    let operand = operand.to_string();
    Arc::new(move |obj: &mut DynamicObject| {
        obj.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(OPERAND_NAME_KEY.to_string(), operand.clone());
        Ok(())
    })
}

/// Replace container images of Deployments.
///
/// `images` is keyed by container name with `-` replaced by `_`, lower-cased.
pub fn deployment_images(images: BTreeMap<String, String>) -> Transformer {
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "Deployment" || images.is_empty() {
            return Ok(());
        }
        let mut deployment: Deployment = to_typed(obj)?;
        let containers = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .map(|p| &mut p.containers);

        let mut changed = false;
        for container in containers.into_iter().flatten() {
            if let Some(image) = images.get(&image_key(&container.name)) {
                container.image = Some(image.clone());
                changed = true;
            }
        }
        if changed {
            from_typed(&deployment, obj)?;
        }
        Ok(())
    })
}

/// Set the node selector, tolerations and priority class of Deployments.
///
/// Only the parts of `config` that are set are written; an empty config
/// leaves the pod spec as the manifest shipped it.
pub fn add_configuration(config: WorkloadConfig) -> Transformer {
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "Deployment" || config.is_empty() {
            return Ok(());
        }
        let mut deployment: Deployment = to_typed(obj)?;
        let Some(pod) = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
        else {
            return Ok(());
        };

        if !config.node_selector.is_empty() {
            pod.node_selector = Some(config.node_selector.clone());
        }
        if !config.tolerations.is_empty() {
            pod.tolerations = Some(config.tolerations.clone());
        }
        if !config.priority_class_name.is_empty() {
            pod.priority_class_name = Some(config.priority_class_name.clone());
        }
        from_typed(&deployment, obj)
    })
}

/// Merge `values` into the data of the `ConfigMap` called `name`, overwriting existing keys.
pub fn copy_config_map(name: &str, values: BTreeMap<String, String>) -> Transformer {
    let name = name.to_string();
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "ConfigMap" || name_of(obj) != name || values.is_empty() {
            return Ok(());
        }
        merge_config_map_data(obj, &values)
    })
}

/// Restrict every `ServiceMonitor` to scrape `namespace`.
pub fn update_service_monitor_target_namespace(namespace: &str) -> Transformer {
    let namespace = namespace.to_string();
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "ServiceMonitor" {
            return Ok(());
        }
        set_nested(
            obj,
            &["spec", "namespaceSelector", "matchNames"],
            json!([namespace]),
        )
    })
}

/// Image overrides taken from the operator environment.
///
/// Only variables starting with `prefix` are used; the prefix is stripped and
/// the rest lower-cased, so `IMAGE_PAC_PAC_CONTROLLER` becomes `pac_controller`.
#[must_use]
pub fn images_from_env(prefix: &str) -> BTreeMap<String, String> {
    images_from_vars(prefix, std::env::vars())
}

/// Same as [`images_from_env`] over an explicit variable list.
pub fn images_from_vars(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> BTreeMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty() && !value.is_empty())
                .map(|rest| (rest.to_lowercase(), value.clone()))
        })
        .collect()
}

fn image_key(container_name: &str) -> String {
    container_name.replace('-', "_").to_lowercase()
}

// ============================================================================
// Additional controller transformers
// ============================================================================

/// Rename the controller `ConfigMap` and merge the entry's settings into it.
///
/// The shared `pipelines-as-code` `ConfigMap` is never renamed or overwritten.
pub fn update_additional_controller_config_map(
    config: &AdditionalPACControllerConfig,
) -> Transformer {
    let config_map_name = config.config_map_name.clone();
    let values = config.settings.clone().unwrap_or_default();
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "ConfigMap" || name_of(obj) == PIPELINES_AS_CODE_CONFIGMAP {
            return Ok(());
        }
        obj.metadata.name = Some(config_map_name.clone());
        if values.is_empty() {
            return Ok(());
        }
        merge_config_map_data(obj, &values)
    })
}

/// Rename the controller `Deployment` and repoint its selector, pod labels,
/// primary container and controller environment.
pub fn update_additional_controller_deployment(
    config: &AdditionalPACControllerConfig,
    name: &str,
) -> Transformer {
    let controller = additional_controller_name(name);
    let config_map_value = non_empty_or(&config.config_map_name, &controller);
    let secret_value = non_empty_or(&config.secret_name, &controller);

    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "Deployment" {
            return Ok(());
        }
        obj.metadata.name = Some(controller.clone());

        let missing = |field| TransformError::MissingField {
            kind: "Deployment".to_string(),
            name: controller.clone(),
            field,
        };

        let mut deployment: Deployment = to_typed(obj)?;
        let spec = deployment.spec.as_mut().ok_or_else(|| missing("spec"))?;

        spec.selector
            .match_labels
            .get_or_insert_with(BTreeMap::new)
            .insert(K8S_NAME.to_string(), controller.clone());

        let template_labels = spec
            .template
            .metadata
            .get_or_insert_with(Default::default)
            .labels
            .get_or_insert_with(BTreeMap::new);
        template_labels.insert(APP_LABEL.to_string(), controller.clone());
        template_labels.insert(K8S_NAME.to_string(), controller.clone());

        let container = spec
            .template
            .spec
            .as_mut()
            .and_then(|p| p.containers.first_mut())
            .ok_or_else(|| missing("spec.template.spec.containers[0]"))?;
        container.name = controller.clone();

        for env in container.env.iter_mut().flatten() {
            let value = match env.name.as_str() {
                ENV_PAC_CONTROLLER_CONFIGMAP => &config_map_value,
                ENV_PAC_CONTROLLER_SECRET => &secret_value,
                ENV_PAC_CONTROLLER_LABEL => &controller,
                _ => continue,
            };
            env.value = Some(value.clone());
        }

        from_typed(&deployment, obj)
    })
}

/// Rename the controller `Service` and point its selector at the renamed pods.
pub fn update_additional_controller_service(name: &str) -> Transformer {
    let controller = additional_controller_name(name);
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "Service" {
            return Ok(());
        }
        obj.metadata.name = Some(controller.clone());
        set_nested(
            obj,
            &["spec", "selector"],
            string_map(K8S_NAME, &controller),
        )?;

        let labels = obj.metadata.labels.get_or_insert_with(BTreeMap::new);
        labels.insert(APP_LABEL.to_string(), controller.clone());
        labels.insert(K8S_NAME.to_string(), controller.clone());
        Ok(())
    })
}

/// Rename the controller `ServiceMonitor`, select the renamed `Service` and
/// restrict it to `namespace`.
pub fn update_additional_controller_service_monitor(name: &str, namespace: &str) -> Transformer {
    let controller = additional_controller_name(name);
    let namespace = namespace.to_string();
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "ServiceMonitor" {
            return Ok(());
        }
        obj.metadata.name = Some(controller.clone());
        set_nested(
            obj,
            &["spec", "selector", "matchLabels"],
            string_map(APP_LABEL, &controller),
        )?;
        set_nested(
            obj,
            &["spec", "namespaceSelector", "matchNames"],
            json!([namespace.clone()]),
        )
    })
}

/// Rename the controller `Route` and send its traffic to the renamed `Service`.
pub fn update_additional_controller_route(name: &str) -> Transformer {
    let controller = additional_controller_name(name);
    Arc::new(move |obj: &mut DynamicObject| {
        if kind_of(obj) != "Route" {
            return Ok(());
        }
        obj.metadata.name = Some(controller.clone());
        set_nested(obj, &["spec", "to", "name"], json!(controller.clone()))?;

        let labels = obj.metadata.labels.get_or_insert_with(BTreeMap::new);
        labels.insert(APP_LABEL.to_string(), controller.clone());
        labels.insert(PAC_ROUTE_LABEL.to_string(), controller.clone());
        Ok(())
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn merge_config_map_data(
    obj: &mut DynamicObject,
    values: &BTreeMap<String, String>,
) -> Result<(), TransformError> {
    let mut config_map: ConfigMap = to_typed(obj)?;
    let data = config_map.data.get_or_insert_with(BTreeMap::new);
    for (key, value) in values {
        data.insert(key.clone(), value.clone());
    }
    from_typed(&config_map, obj)
}

/// Set `value` at `path` below the object root, creating intermediate maps.
fn set_nested(
    obj: &mut DynamicObject,
    path: &[&'static str],
    value: Value,
) -> Result<(), TransformError> {
    set_value_at(&mut obj.data, path, value).map_err(|field| TransformError::InvalidField {
        kind: kind_of(obj).to_string(),
        name: name_of(obj).to_string(),
        field,
        expected: "an object",
    })
}

/// Returns the path segment whose parent is not a map on failure.
fn set_value_at(target: &mut Value, path: &[&'static str], value: Value) -> Result<(), &'static str> {
    let Some((segment, rest)) = path.split_first() else {
        *target = value;
        return Ok(());
    };
    if target.is_null() {
        *target = Value::Object(Map::new());
    }
    let map = target.as_object_mut().ok_or(*segment)?;
    let child = map.entry((*segment).to_string()).or_insert(Value::Null);
    set_value_at(child, rest, value)
}

fn string_map(key: &str, value: &str) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    Value::Object(map)
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod transform_tests;
