//! Snapshot tests for the dialogue policy and health report

#[cfg(test)]
mod snapshot_tests {
    use crate::engine::{HealthReport, HealthStatus};
    use crate::{ConversationTurn, DialoguePolicy};
    use insta::assert_yaml_snapshot;
    use std::collections::BTreeMap;

    #[test]
    fn test_policy_classification_snapshot() {
        let policy = DialoguePolicy::new();
        let asked = vec![
            ConversationTurn::user("The amp has no sound"),
            ConversationTurn::assistant(
                "Sorry to hear that. What firmware version is installed and which input source are you using?",
            ),
        ];
        let duck = vec![ConversationTurn::user("It is set to DUCK mode")];
        let none: &[ConversationTurn] = &[];

        let cases: Vec<(&str, &str, &[ConversationTurn])> = vec![
            ("a_no_audio", "I'm not getting any audio", none),
            ("b_crackling", "There is crackling on the left channel", none),
            ("c_follow_up", "Firmware 2.1 on the optical input", &asked[..]),
            ("d_both_inputs", "What happens when both HDMI and analog inputs are active?", none),
            ("e_both_inputs_duck", "What happens when both HDMI and analog inputs are active?", &duck[..]),
            ("f_power", "What is the output power into 8 ohms?", none),
            ("g_spec_after_thread", "Thanks, which cable do I need?", &asked[..]),
        ];

        let modes: BTreeMap<&str, _> = cases
            .into_iter()
            .map(|(id, message, history)| (id, policy.classify(message, history)))
            .collect();

        assert_yaml_snapshot!(modes, @r###"
        a_no_audio: diagnostic_gather
        b_crackling: diagnostic_gather
        c_follow_up: diagnostic_resolve
        d_both_inputs: config_ask
        e_both_inputs_duck: config_answer
        f_power: direct
        g_spec_after_thread: diagnostic_gather
        "###);
    }

    #[test]
    fn test_health_report_snapshot() {
        let report = HealthReport {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            index_ready: true,
            documents_count: 42,
        };

        assert_yaml_snapshot!(report, @r###"
        status: healthy
        version: 0.1.0
        index_ready: true
        documents_count: 42
        "###);
    }
}
