// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `orphans.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        AdditionalPACControllerConfig, OpenShiftPipelinesAsCodeStatus, TektonInstallerSet,
        TektonInstallerSetSpec,
    };
    use crate::labels::INSTALLER_SET_TYPE_KEY;
    use crate::reconcilers::pipelinesascode::orphans::*;
    use crate::testdata::{FakeFailure, FakeInstallerSets};
    use std::collections::BTreeMap;

    fn desired(names: &[&str]) -> BTreeMap<String, AdditionalPACControllerConfig> {
        names
            .iter()
            .map(|n| {
                (
                    (*n).to_string(),
                    AdditionalPACControllerConfig {
                        enable: Some(true),
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_selector_and_labels() {
        assert_eq!(
            additional_controller_selector(),
            "operator.tekton.dev/created-by=OpenShiftPipelinesAsCode,operator.tekton.dev/component=AdditionalPACController"
        );
        let labels = additional_controller_labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(
            labels.get("operator.tekton.dev/component").map(String::as_str),
            Some("AdditionalPACController")
        );
    }

    #[test]
    fn test_logical_name_prefers_annotation() {
        let fake = FakeInstallerSets::default();
        fake.add_live_custom("gitlab", true);
        let mut set = fake.live_custom.lock().unwrap()[0].clone();

        assert_eq!(logical_name(&set).as_deref(), Some("gitlab"));

        // Annotation and label disagree: annotation wins
        set.labels_mut()
            .insert(INSTALLER_SET_TYPE_KEY.to_string(), "custom-other".to_string());
        assert_eq!(logical_name(&set).as_deref(), Some("gitlab"));
    }

    #[test]
    fn test_logical_name_falls_back_to_type_label() {
        let fake = FakeInstallerSets::default();
        fake.add_live_custom("custom-with-dash", false);
        let set = fake.live_custom.lock().unwrap()[0].clone();

        assert_eq!(logical_name(&set).as_deref(), Some("custom-with-dash"));
    }

    #[test]
    fn test_logical_name_missing() {
        let set = TektonInstallerSet::new("unlabelled", TektonInstallerSetSpec::default());
        assert_eq!(logical_name(&set), None);
    }

    #[test]
    fn test_orphaned_names() {
        let fake = FakeInstallerSets::default();
        for name in ["a", "b", "c"] {
            fake.add_live_custom(name, true);
        }
        let live = fake.live_custom.lock().unwrap().clone();

        assert_eq!(orphaned_names(&live, &desired(&["a", "c"])), vec!["b"]);
        assert!(orphaned_names(&live, &desired(&["a", "b", "c"])).is_empty());
        assert_eq!(
            orphaned_names(&live, &BTreeMap::new()),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_disabled_entry_is_orphaned() {
        let fake = FakeInstallerSets::default();
        fake.add_live_custom("a", true);
        let live = fake.live_custom.lock().unwrap().clone();

        let mut configured = desired(&["a"]);
        configured.get_mut("a").unwrap().enable = Some(false);

        assert_eq!(orphaned_names(&live, &configured), vec!["a"]);
    }

    #[test]
    fn test_duplicate_sets_cleaned_once() {
        let fake = FakeInstallerSets::default();
        fake.add_live_custom("b", true);
        fake.add_live_custom("b", false);
        let live = fake.live_custom.lock().unwrap().clone();

        assert_eq!(orphaned_names(&live, &desired(&[])), vec!["b"]);
    }

    #[tokio::test]
    async fn test_cleanup_orphans_issues_one_cleanup() {
        let fake = FakeInstallerSets::default();
        for name in ["a", "b", "c"] {
            fake.add_live_custom(name, true);
        }
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        status
            .installer_set_names
            .insert("custom-b".to_string(), "openshiftpipelinesascode-custom-b-x1".to_string());
        status
            .installer_set_names
            .insert("main".to_string(), "openshiftpipelinesascode-main-x1".to_string());

        let cleaned = cleanup_orphans(&fake, &desired(&["a", "c"]), &mut status)
            .await
            .unwrap();

        assert_eq!(cleaned, vec!["b"]);
        assert_eq!(fake.calls(), vec!["list", "cleanup:b"]);
        assert!(!status.installer_set_names.contains_key("custom-b"));
        assert!(status.installer_set_names.contains_key("main"));
    }

    #[tokio::test]
    async fn test_cleanup_orphans_propagates_cleanup_error() {
        let fake = FakeInstallerSets::default();
        fake.add_live_custom("b", true);
        *fake.fail_cleanup.lock().unwrap() = Some(FakeFailure::Error);

        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        let result = cleanup_orphans(&fake, &desired(&[]), &mut status).await;

        assert!(result.is_err());
        assert_eq!(fake.calls(), vec!["list", "cleanup:b"]);
    }
}
