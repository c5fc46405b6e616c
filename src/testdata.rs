// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests.

/// Trimmed Pipelines-as-Code release manifest.
pub const RELEASE_MANIFEST: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: pipelines-as-code
  labels:
    app.kubernetes.io/part-of: pipelines-as-code
---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: pipelines-as-code-controller
  namespace: pipelines-as-code
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: pipelines-as-code-controller-binding
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: ClusterRole
  name: pipeline-as-code-controller-role
subjects:
  - kind: ServiceAccount
    name: pipelines-as-code-controller
    namespace: pipelines-as-code
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: pipelines-as-code
  namespace: pipelines-as-code
  labels:
    app.kubernetes.io/part-of: pipelines-as-code
data:
  application-name: "Pipelines as Code CI"
  hub-url: "https://api.hub.tekton.dev/v1"
  remote-tasks: "true"
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: pipelines-as-code-info
  namespace: pipelines-as-code
data:
  version: "v0.24.5"
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: pipelines-as-code-controller
  namespace: pipelines-as-code
  labels:
    app.kubernetes.io/name: controller
    app.kubernetes.io/part-of: pipelines-as-code
spec:
  replicas: 1
  selector:
    matchLabels:
      app.kubernetes.io/name: controller
      app.kubernetes.io/part-of: pipelines-as-code
  template:
    metadata:
      labels:
        app: pipelines-as-code-controller
        app.kubernetes.io/name: controller
        app.kubernetes.io/part-of: pipelines-as-code
    spec:
      serviceAccountName: pipelines-as-code-controller
      containers:
        - name: pac-controller
          image: ghcr.io/openshift-pipelines/pipelines-as-code-controller:v0.24.5
          ports:
            - name: api
              containerPort: 8082
          env:
            - name: CONFIG_LOGGING_NAME
              value: pac-config-logging
            - name: TLS_KEY
              value: key
            - name: SYSTEM_NAMESPACE
              valueFrom:
                fieldRef:
                  fieldPath: metadata.namespace
            - name: PAC_CONTROLLER_LABEL
              value: default
            - name: PAC_CONTROLLER_SECRET
              value: pipelines-as-code-secret
            - name: PAC_CONTROLLER_CONFIGMAP
              value: pipelines-as-code
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: pipelines-as-code-watcher
  namespace: pipelines-as-code
spec:
  replicas: 1
  selector:
    matchLabels:
      app.kubernetes.io/name: watcher
  template:
    metadata:
      labels:
        app.kubernetes.io/name: watcher
    spec:
      containers:
        - name: pac-watcher
          image: ghcr.io/openshift-pipelines/pipelines-as-code-watcher:v0.24.5
---
apiVersion: v1
kind: Service
metadata:
  name: pipelines-as-code-controller
  namespace: pipelines-as-code
  labels:
    app: pipelines-as-code-controller
    app.kubernetes.io/part-of: pipelines-as-code
spec:
  ports:
    - name: http-listener
      port: 8080
      protocol: TCP
      targetPort: 8082
  selector:
    app.kubernetes.io/name: controller
    app.kubernetes.io/part-of: pipelines-as-code
---
apiVersion: route.openshift.io/v1
kind: Route
metadata:
  name: pipelines-as-code-controller
  namespace: pipelines-as-code
  labels:
    app.kubernetes.io/part-of: pipelines-as-code
    pipelines-as-code/route: controller
spec:
  port:
    targetPort: http-listener
  tls:
    insecureEdgeTerminationPolicy: Redirect
    termination: edge
  to:
    kind: Service
    name: pipelines-as-code-controller
    weight: 100
---
apiVersion: monitoring.coreos.com/v1
kind: ServiceMonitor
metadata:
  name: pipelines-as-code-controller-monitor
  namespace: pipelines-as-code
spec:
  endpoints:
    - interval: 10s
      port: http-metrics
  namespaceSelector:
    matchNames:
      - pipelines-as-code
  selector:
    matchLabels:
      app: pipelines-as-code-controller
"#;

/// How a fake collaborator call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    /// Return the requeue-after sentinel
    Requeue,
    /// Return a plain error
    Error,
}

impl FakeFailure {
    pub fn into_error(self, what: &str) -> anyhow::Error {
        match self {
            Self::Requeue => crate::errors::ReconcileEvent::requeue_after_default().into(),
            Self::Error => anyhow::anyhow!("{what} failed"),
        }
    }
}

/// In-memory [`InstallerSetClient`](crate::installerset::InstallerSetClient)
/// recording every call.
#[derive(Default)]
pub struct FakeInstallerSets {
    /// Calls in order: `main`, `custom:<name>`, `list`, `cleanup:<name>`,
    /// `pre`, `post`, `cleanup-pre`, `cleanup-post`
    pub calls: std::sync::Mutex<Vec<String>>,
    /// Rendered manifests per set type
    pub rendered: std::sync::Mutex<Vec<(String, crate::manifest::Manifest)>>,
    /// Labels passed to `custom_set`, per name
    pub custom_labels: std::sync::Mutex<Vec<(String, std::collections::BTreeMap<String, String>)>>,
    /// Sets returned by `list_custom_sets`
    pub live_custom: std::sync::Mutex<Vec<crate::crd::TektonInstallerSet>>,
    pub fail_main: std::sync::Mutex<Option<FakeFailure>>,
    pub fail_custom: std::sync::Mutex<std::collections::BTreeMap<String, FakeFailure>>,
    pub fail_list: std::sync::Mutex<Option<FakeFailure>>,
    pub fail_cleanup: std::sync::Mutex<Option<FakeFailure>>,
}

impl FakeInstallerSets {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that create or change installer sets.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "list")
            .collect()
    }

    pub fn rendered(&self, set_type: &str) -> Option<crate::manifest::Manifest> {
        self.rendered
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == set_type)
            .map(|(_, m)| m.clone())
    }

    /// Register a live custom set for `name` the way the kube client labels it.
    pub fn add_live_custom(&self, name: &str, with_annotation: bool) {
        use crate::labels::{
            custom_set_type, ADDITIONAL_CONTROLLER_NAME_KEY, ADDITIONAL_PAC_CONTROLLER_COMPONENT,
            COMPONENT_KEY, CREATED_BY_KEY, INSTALLER_SET_TYPE_KEY,
        };
        let mut set = crate::crd::TektonInstallerSet::new(
            &format!("openshiftpipelinesascode-{}-x1", custom_set_type(name)),
            crate::crd::TektonInstallerSetSpec::default(),
        );
        set.metadata.labels = Some(std::collections::BTreeMap::from([
            (
                CREATED_BY_KEY.to_string(),
                crate::constants::KIND_OPENSHIFT_PIPELINES_AS_CODE.to_string(),
            ),
            (
                COMPONENT_KEY.to_string(),
                ADDITIONAL_PAC_CONTROLLER_COMPONENT.to_string(),
            ),
            (INSTALLER_SET_TYPE_KEY.to_string(), custom_set_type(name)),
        ]));
        if with_annotation {
            set.metadata.annotations = Some(std::collections::BTreeMap::from([(
                ADDITIONAL_CONTROLLER_NAME_KEY.to_string(),
                name.to_string(),
            )]));
        }
        self.live_custom.lock().unwrap().push(set);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn render(
        &self,
        set_type: &str,
        manifest: &crate::manifest::Manifest,
        transform: &crate::installerset::ManifestTransform,
    ) -> anyhow::Result<String> {
        let rendered = transform(manifest)?;
        self.rendered
            .lock()
            .unwrap()
            .push((set_type.to_string(), rendered));
        Ok(format!("openshiftpipelinesascode-{set_type}-x1"))
    }
}

#[async_trait::async_trait]
impl crate::installerset::InstallerSetClient for FakeInstallerSets {
    async fn main_set(
        &self,
        _owner: &crate::crd::OpenShiftPipelinesAsCode,
        manifest: &crate::manifest::Manifest,
        transform: &crate::installerset::ManifestTransform,
    ) -> anyhow::Result<String> {
        self.record("main".to_string());
        if let Some(failure) = *self.fail_main.lock().unwrap() {
            return Err(failure.into_error("main set"));
        }
        self.render("main", manifest, transform)
    }

    async fn custom_set(
        &self,
        _owner: &crate::crd::OpenShiftPipelinesAsCode,
        name: &str,
        manifest: &crate::manifest::Manifest,
        transform: &crate::installerset::ManifestTransform,
        labels: &std::collections::BTreeMap<String, String>,
    ) -> anyhow::Result<String> {
        self.record(format!("custom:{name}"));
        self.custom_labels
            .lock()
            .unwrap()
            .push((name.to_string(), labels.clone()));
        let failure = self.fail_custom.lock().unwrap().get(name).copied();
        if let Some(failure) = failure {
            return Err(failure.into_error("custom set"));
        }
        self.render(&crate::labels::custom_set_type(name), manifest, transform)
    }

    async fn list_custom_sets(
        &self,
        _label_selector: &str,
    ) -> anyhow::Result<Vec<crate::crd::TektonInstallerSet>> {
        self.record("list".to_string());
        if let Some(failure) = *self.fail_list.lock().unwrap() {
            return Err(failure.into_error("list"));
        }
        Ok(self.live_custom.lock().unwrap().clone())
    }

    async fn cleanup_custom_set(&self, name: &str) -> anyhow::Result<()> {
        self.record(format!("cleanup:{name}"));
        if let Some(failure) = *self.fail_cleanup.lock().unwrap() {
            return Err(failure.into_error("cleanup"));
        }
        Ok(())
    }

    async fn pre_set(
        &self,
        _owner: &crate::crd::OpenShiftPipelinesAsCode,
        manifest: &crate::manifest::Manifest,
        transform: &crate::installerset::ManifestTransform,
    ) -> anyhow::Result<String> {
        self.record("pre".to_string());
        self.render("pre", manifest, transform)
    }

    async fn post_set(
        &self,
        _owner: &crate::crd::OpenShiftPipelinesAsCode,
        manifest: &crate::manifest::Manifest,
        transform: &crate::installerset::ManifestTransform,
    ) -> anyhow::Result<String> {
        self.record("post".to_string());
        self.render("post", manifest, transform)
    }

    async fn cleanup_pre_set(&self) -> anyhow::Result<()> {
        self.record("cleanup-pre".to_string());
        Ok(())
    }

    async fn cleanup_post_set(&self) -> anyhow::Result<()> {
        self.record("cleanup-post".to_string());
        Ok(())
    }
}

/// [`DependencyReadiness`](crate::dependency::DependencyReadiness) returning a fixed answer.
pub struct FakeDependency(pub std::sync::Mutex<crate::dependency::PipelineReadiness>);

impl FakeDependency {
    pub fn new(readiness: crate::dependency::PipelineReadiness) -> Self {
        Self(std::sync::Mutex::new(readiness))
    }
}

#[async_trait::async_trait]
impl crate::dependency::DependencyReadiness for FakeDependency {
    async fn pipeline_ready(&self) -> anyhow::Result<crate::dependency::PipelineReadiness> {
        Ok(*self.0.lock().unwrap())
    }
}

/// [`Extension`](crate::extension::Extension) recording its hook calls.
#[derive(Default)]
pub struct FakeExtension {
    pub calls: std::sync::Mutex<Vec<&'static str>>,
    pub fail_pre: std::sync::Mutex<Option<FakeFailure>>,
    pub fail_post: std::sync::Mutex<Option<FakeFailure>>,
}

impl FakeExtension {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::extension::Extension for FakeExtension {
    async fn pre_reconcile(&self, _owner: &crate::crd::OpenShiftPipelinesAsCode) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("pre");
        match *self.fail_pre.lock().unwrap() {
            Some(failure) => Err(failure.into_error("pre-reconcile")),
            None => Ok(()),
        }
    }

    async fn post_reconcile(&self, _owner: &crate::crd::OpenShiftPipelinesAsCode) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("post");
        match *self.fail_post.lock().unwrap() {
            Some(failure) => Err(failure.into_error("post-reconcile")),
            None => Ok(()),
        }
    }

    fn transformers(&self, _owner: &crate::crd::OpenShiftPipelinesAsCode) -> Vec<crate::manifest::Transformer> {
        Vec::new()
    }
}
