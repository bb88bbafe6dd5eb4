//! Snapshot tests for the OpenAI client

#[cfg(test)]
mod snapshot_tests {
    use crate::{Embedder, LLMProvider, OpenAiClient, OpenAiConfig};
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_config_snapshot() {
        let config = OpenAiConfig::new("sk-live-secret".to_string());

        assert_yaml_snapshot!(config, {
            ".api_key" => "[redacted]",
        }, @r###"
        api_key: "[redacted]"
        base_url: "https://api.openai.com/v1"
        embedding_model: text-embedding-3-small
        llm_model: gpt-4o-mini
        embedding_dimension: 1536
        timeout:
          secs: 60
          nanos: 0
        "###);
    }

    #[test]
    fn test_client_reports_configured_models() {
        let config = OpenAiConfig::new("sk-test".to_string());
        let client = OpenAiClient::new(config).unwrap();

        assert_eq!(client.model_id(), "gpt-4o-mini");
        assert_eq!(client.model_name(), "text-embedding-3-small");
        assert_eq!(client.dimension(), 1536);
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = OpenAiConfig::new("sk-test".to_string()).with_base_url("::nope::");
        assert!(OpenAiClient::new(config).is_err());
    }
}
