//! Snapshot tests for core data model

#[cfg(test)]
mod snapshot_tests {
    use crate::{ChatReply, Citation, EntryDraft, Priority};
    use insta::assert_yaml_snapshot;
    use serde_json::json;

    #[test]
    fn test_entry_draft_snapshot() {
        let draft = EntryDraft::new("Mono bridging requires 4 ohm loads.", "UA2-125 Installation Guide")
            .with_title("Mono Mode")
            .with_category("wiring")
            .with_tag("speakers")
            .with_tag("mono")
            .with_priority(Priority::High)
            .with_metadata("page", json!(12));

        assert_yaml_snapshot!(draft, @r###"
        content: Mono bridging requires 4 ohm loads.
        title: Mono Mode
        source: UA2-125 Installation Guide
        category: wiring
        tags:
          - mono
          - speakers
        priority: high
        metadata:
          page: 12
        "###);
    }

    #[test]
    fn test_chat_reply_snapshot() {
        let reply = ChatReply {
            answer: "Use the HDMI ARC port.".to_string(),
            citations: vec![Citation {
                content_excerpt: "HDMI ARC carries TV audio".to_string(),
                source: "Quick Start".to_string(),
                similarity: 0.912,
            }],
        };

        assert_yaml_snapshot!(reply, @r###"
        answer: Use the HDMI ARC port.
        citations:
          - content_excerpt: HDMI ARC carries TV audio
            source: Quick Start
            similarity: 0.912
        "###);
    }
}
