//! Application configuration
//!
//! Read once at startup by the binaries and passed into the chat client
//! and server. Nothing in the core reads the environment on its own.

use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "mistralai/mistral-7b-instruct";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OpenAI-compatible API root (OpenRouter, Ollama `/v1`, ...)
    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub api_port: u16,
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_timeout = non_empty("LLM_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let api_port = non_empty("PORT")
            .or_else(|| non_empty("API_PORT"))
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            llm_base_url: non_empty("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            llm_api_key: non_empty("OPENROUTER_API_KEY")
                .filter(|key| key != "your_openrouter_api_key_here"),
            llm_model: non_empty("OPENROUTER_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout: Duration::from_secs(llm_timeout),
            api_port,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.llm_base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
        assert_eq!(config.api_port, 8000);
        assert!(config.llm_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LLM_BASE_URL", "http://test-ollama:11434/v1/"),
            ("OPENROUTER_API_KEY", "sk-test-openrouter"),
            ("OPENROUTER_MODEL", "test-model"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("API_PORT", "9090"),
        ]);

        assert_eq!(config.llm_base_url, "http://test-ollama:11434/v1");
        assert_eq!(config.llm_api_key.as_deref(), Some("sk-test-openrouter"));
        assert_eq!(config.llm_model, "test-model");
        assert_eq!(config.llm_timeout, Duration::from_secs(5));
        assert_eq!(config.api_port, 9090);
    }

    #[test]
    fn test_port_prefers_port_var() {
        let config = config_from(&[("PORT", "7000"), ("API_PORT", "9090")]);
        assert_eq!(config.api_port, 7000);
    }

    #[test]
    fn test_blank_or_placeholder_key_is_missing() {
        assert!(config_from(&[("OPENROUTER_API_KEY", "  ")]).llm_api_key.is_none());
        assert!(config_from(&[("OPENROUTER_API_KEY", "your_openrouter_api_key_here")])
            .llm_api_key
            .is_none());
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = config_from(&[("LLM_TIMEOUT_SECS", "soon"), ("PORT", "http")]);
        assert_eq!(config.llm_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let config = config_from(&[("LLM_TIMEOUT_SECS", "0")]);
        assert_eq!(config.llm_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.api_port, DEFAULT_PORT);
    }
}
