// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `defaults.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::crd::WorkloadConfig;
    use crate::settings::KNOWN_SETTINGS;

    fn spec_with(
        controllers: Vec<(&str, AdditionalPACControllerConfig)>,
    ) -> OpenShiftPipelinesAsCodeSpec {
        OpenShiftPipelinesAsCodeSpec {
            target_namespace: "openshift-pipelines".to_string(),
            config: WorkloadConfig::default(),
            pac_settings: PACSettings {
                settings: None,
                additional_pac_controllers: Some(
                    controllers
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                ),
            },
        }
    }

    #[test]
    fn test_defaults_initialize_absent_maps() {
        let spec = apply_defaults(&OpenShiftPipelinesAsCodeSpec::default());

        assert!(spec.pac_settings.additional_pac_controllers.is_some());
        let settings = spec.pac_settings.settings.expect("settings initialized");
        let defaulted = KNOWN_SETTINGS.iter().filter(|k| k.default.is_some()).count();
        assert_eq!(settings.len(), defaulted);
    }

    #[test]
    fn test_defaults_fill_additional_controller() {
        let spec = apply_defaults(&spec_with(vec![(
            "test",
            AdditionalPACControllerConfig::default(),
        )]));

        let controllers = spec.pac_settings.additional_pac_controllers.unwrap();
        let test = &controllers["test"];
        assert_eq!(test.enable, Some(true));
        assert_eq!(test.config_map_name, "test-configmap");
        assert_eq!(test.secret_name, "test-secret");
        assert_eq!(
            test.settings.as_ref().unwrap()["hub-url"],
            "https://api.hub.tekton.dev/v1"
        );
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let once = apply_defaults(&spec_with(vec![
            ("a", AdditionalPACControllerConfig::default()),
            (
                "b",
                AdditionalPACControllerConfig {
                    enable: Some(false),
                    ..Default::default()
                },
            ),
        ]));
        let twice = apply_defaults(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_defaults_do_not_touch_fully_specified_entry() {
        // Arrange: every field set, settings already carry every default
        let mut settings = BTreeMap::new();
        crate::settings::set_defaults(&mut settings);
        settings.insert("hub-catalog-name".to_string(), "custom".to_string());
        let entry = AdditionalPACControllerConfig {
            enable: Some(false),
            config_map_name: "my-cm".to_string(),
            secret_name: "my-secret".to_string(),
            settings: Some(settings),
        };

        // Act
        let spec = apply_defaults(&spec_with(vec![("test", entry.clone())]));

        // Assert
        assert_eq!(
            spec.pac_settings.additional_pac_controllers.unwrap()["test"],
            entry
        );
    }

    #[test]
    fn test_defaults_keep_user_settings() {
        let mut user = BTreeMap::new();
        user.insert("remote-tasks".to_string(), "false".to_string());
        let mut spec = spec_with(vec![]);
        spec.pac_settings.settings = Some(user);

        spec.set_defaults();

        let settings = spec.pac_settings.settings.unwrap();
        assert_eq!(settings["remote-tasks"], "false");
        assert_eq!(settings["secret-auto-create"], "true");
    }
}
