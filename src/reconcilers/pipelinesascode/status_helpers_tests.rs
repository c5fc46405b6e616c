// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_helpers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::OpenShiftPipelinesAsCodeStatus;
    use crate::reconcilers::pipelinesascode::status_helpers::*;
    use crate::reconcilers::status::find_condition;

    fn status_of<'a>(status: &'a OpenShiftPipelinesAsCodeStatus, t: &str) -> &'a str {
        find_condition(&status.conditions, t)
            .map(|c| c.status.as_str())
            .unwrap_or("<missing>")
    }

    fn message_of(status: &OpenShiftPipelinesAsCodeStatus, t: &str) -> String {
        find_condition(&status.conditions, t)
            .and_then(|c| c.message.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_initialize_conditions_sets_unknown() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        initialize_conditions(&mut status);

        assert_eq!(status.conditions.len(), DEPENDENT_CONDITIONS.len() + 1);
        for t in DEPENDENT_CONDITIONS {
            assert_eq!(status_of(&status, t), "Unknown");
        }
        assert_eq!(status_of(&status, CONDITION_READY), "Unknown");
    }

    #[test]
    fn test_initialize_conditions_keeps_existing() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        initialize_conditions(&mut status);
        mark_dependencies_installed(&mut status);

        initialize_conditions(&mut status);
        assert_eq!(status_of(&status, CONDITION_DEPENDENCIES_INSTALLED), "True");
    }

    #[test]
    fn test_ready_once_every_stage_completes() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        initialize_conditions(&mut status);

        mark_dependencies_installed(&mut status);
        mark_pre_reconciler_complete(&mut status);
        mark_installer_set_ready(&mut status);
        mark_additional_pac_controller_complete(&mut status);
        assert_eq!(status_of(&status, CONDITION_READY), "Unknown");
        assert!(!is_ready(&status));

        mark_post_reconciler_complete(&mut status);
        assert!(is_ready(&status));
    }

    #[test]
    fn test_failed_stage_makes_ready_false() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        initialize_conditions(&mut status);

        mark_dependency_installing(&mut status, "tekton-pipelines is still installing");

        assert_eq!(status_of(&status, CONDITION_DEPENDENCIES_INSTALLED), "False");
        assert_eq!(status_of(&status, CONDITION_READY), "False");
        assert_eq!(
            message_of(&status, CONDITION_READY),
            "Dependencies are installing: tekton-pipelines is still installing"
        );
    }

    #[test]
    fn test_dependency_missing_message() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        mark_dependency_missing(&mut status, "tekton-pipelines does not exist");

        assert_eq!(
            message_of(&status, CONDITION_DEPENDENCIES_INSTALLED),
            "Dependencies are missing: tekton-pipelines does not exist"
        );
    }

    #[test]
    fn test_installer_set_not_ready_then_recovered() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        initialize_conditions(&mut status);
        mark_installer_set_not_ready(&mut status, "boom");
        assert_eq!(status_of(&status, CONDITION_READY), "False");

        mark_installer_set_ready(&mut status);
        assert_eq!(status_of(&status, CONDITION_READY), "Unknown");
    }

    #[test]
    fn test_mark_not_ready_only_touches_ready() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        initialize_conditions(&mut status);
        mark_not_ready(&mut status, "Resource ignored");

        assert_eq!(status_of(&status, CONDITION_READY), "False");
        assert_eq!(message_of(&status, CONDITION_READY), "Ready: Resource ignored");
        assert_eq!(status_of(&status, CONDITION_INSTALLER_SET_READY), "Unknown");
    }

    #[test]
    fn test_post_reconciler_failed() {
        let mut status = OpenShiftPipelinesAsCodeStatus::default();
        mark_post_reconciler_failed(&mut status, "PostReconciliation failed: boom");

        assert_eq!(status_of(&status, CONDITION_POST_RECONCILER_COMPLETE), "False");
        assert_eq!(
            message_of(&status, CONDITION_READY),
            "PostReconciliation failed: boom"
        );
    }
}
