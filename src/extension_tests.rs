// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `extension.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::OpenShiftPipelinesAsCodeSpec;
    use crate::manifest::name_of;
    use crate::testdata::FakeInstallerSets;
    use serde_json::json;

    const PRE_MANIFEST: &str = r"
apiVersion: v1
kind: ServiceAccount
metadata:
  name: pac-pre
";

    fn owner(target_namespace: &str) -> OpenShiftPipelinesAsCode {
        OpenShiftPipelinesAsCode::new(
            "pipelines-as-code",
            OpenShiftPipelinesAsCodeSpec {
                target_namespace: target_namespace.to_string(),
                ..Default::default()
            },
        )
    }

    fn deployment() -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "pac" },
            "spec": {
                "selector": { "matchLabels": { "app": "pac" } },
                "template": {
                    "spec": {
                        "securityContext": { "runAsUser": 65532, "runAsNonRoot": true },
                        "containers": [{
                            "name": "pac",
                            "securityContext": { "runAsUser": 65532, "runAsGroup": 65532 }
                        }]
                    }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_noop_extension() {
        let ext = NoopExtension;
        let pac = owner("");

        assert!(ext.pre_reconcile(&pac).await.is_ok());
        assert!(ext.post_reconcile(&pac).await.is_ok());
        assert!(ext.transformers(&pac).is_empty());
    }

    #[tokio::test]
    async fn test_openshift_extension_installs_pre_manifest() {
        let fake = Arc::new(FakeInstallerSets::default());
        let ext = OpenShiftExtension::new(
            fake.clone(),
            Some(Manifest::from_yaml_str(PRE_MANIFEST).unwrap()),
            None,
            "openshift-pipelines",
        );

        ext.pre_reconcile(&owner("")).await.unwrap();
        ext.post_reconcile(&owner("")).await.unwrap();

        assert_eq!(fake.calls(), vec!["pre", "cleanup-post"]);

        let rendered = fake.rendered("pre").unwrap();
        assert_eq!(name_of(&rendered.resources()[0]), "pac-pre");
        assert_eq!(
            rendered.resources()[0].metadata.namespace.as_deref(),
            Some("openshift-pipelines")
        );
    }

    #[tokio::test]
    async fn test_openshift_extension_uses_target_namespace() {
        let fake = Arc::new(FakeInstallerSets::default());
        let ext = OpenShiftExtension::new(
            fake.clone(),
            None,
            Some(Manifest::from_yaml_str(PRE_MANIFEST).unwrap()),
            "openshift-pipelines",
        );

        ext.pre_reconcile(&owner("pac-system")).await.unwrap();
        ext.post_reconcile(&owner("pac-system")).await.unwrap();

        assert_eq!(fake.calls(), vec!["cleanup-pre", "post"]);
        let rendered = fake.rendered("post").unwrap();
        assert_eq!(
            rendered.resources()[0].metadata.namespace.as_deref(),
            Some("pac-system")
        );
    }

    #[test]
    fn test_remove_pod_security_fields() {
        let ext = OpenShiftExtension::new(
            Arc::new(FakeInstallerSets::default()),
            None,
            None,
            "openshift-pipelines",
        );
        let mut obj = deployment();

        for transformer in ext.transformers(&owner("")) {
            transformer(&mut obj).unwrap();
        }

        let pod = obj.data.pointer("/spec/template/spec").unwrap();
        assert_eq!(pod["securityContext"], json!({ "runAsNonRoot": true }));
        assert_eq!(pod["containers"][0]["securityContext"], json!({}));
    }

    #[test]
    fn test_remove_pod_security_field_ignores_other_kinds() {
        let mut obj: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "p" },
            "spec": { "securityContext": { "runAsUser": 1 } }
        }))
        .unwrap();
        let before = obj.data.clone();

        remove_pod_security_field("runAsUser")(&mut obj).unwrap();
        assert_eq!(obj.data, before);
    }

    fn volume_names(obj: &DynamicObject) -> Vec<String> {
        let deployment: Deployment = to_typed(obj).unwrap();
        deployment
            .spec
            .unwrap()
            .template
            .spec
            .unwrap()
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| v.name)
            .collect()
    }

    #[test]
    fn test_apply_ca_bundles_mounts_both_bundles() {
        let mut obj = deployment();
        apply_ca_bundles()(&mut obj).unwrap();

        assert_eq!(
            volume_names(&obj),
            vec![
                "config-trusted-cabundle-volume".to_string(),
                "config-service-cabundle-volume".to_string(),
            ]
        );

        let pod = obj.data.pointer("/spec/template/spec").unwrap();
        assert_eq!(
            pod["volumes"][0]["configMap"]["name"],
            TRUSTED_CA_CONFIGMAP
        );
        assert_eq!(
            pod["volumes"][1]["configMap"]["items"][0]["key"],
            "service-ca.crt"
        );

        let mounts = &pod["containers"][0]["volumeMounts"];
        assert_eq!(mounts[0]["mountPath"], "/tekton-custom-certs/ca-bundle.crt");
        assert_eq!(mounts[0]["subPath"], "ca-bundle.crt");
        assert_eq!(mounts[0]["readOnly"], true);
        assert_eq!(mounts[1]["mountPath"], "/tekton-custom-certs/service-ca.crt");
    }

    #[test]
    fn test_apply_ca_bundles_is_idempotent() {
        let mut obj = deployment();
        apply_ca_bundles()(&mut obj).unwrap();
        let once = obj.data.clone();

        apply_ca_bundles()(&mut obj).unwrap();
        assert_eq!(obj.data, once);
    }

    #[test]
    fn test_openshift_transformers_include_ca_bundles() {
        let ext = OpenShiftExtension::new(
            Arc::new(FakeInstallerSets::default()),
            None,
            None,
            "openshift-pipelines",
        );
        let mut obj = deployment();

        for transformer in ext.transformers(&owner("")) {
            transformer(&mut obj).unwrap();
        }

        assert_eq!(volume_names(&obj).len(), 2);
    }
}
