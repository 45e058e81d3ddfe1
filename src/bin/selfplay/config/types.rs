use std::collections::BTreeMap;

use serde::Deserialize;

/// Contents of `config.toml`.
///
/// ```toml
/// default_provider = "work"
///
/// [providers.work]
/// backend = "azure"
/// base_url = "https://my-resource.openai.azure.com"
/// api_version = "2024-02-15-preview"
/// model = "gpt-4o"
///
/// [interaction]
/// turns = 8
/// auto_end = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_provider: Option<String>,
    pub providers: BTreeMap<String, ProviderConfig>,
    pub interaction: InteractionSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend name; defaults to the table's own name.
    pub backend: Option<String>,
    pub api_key: Option<String>,
    /// Environment variable to read the key from instead of the backend's usual one.
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub api_version: Option<String>,
    pub deployment_id: Option<String>,
    pub region: Option<String>,
    /// Retry transient failures with backoff.
    pub resilient: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    pub turns: usize,
    pub auto_end: bool,
    pub max_turns: Option<usize>,
    pub end_threshold: f64,
    pub turn_delay_ms: u64,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            turns: 10,
            auto_end: false,
            max_turns: None,
            end_threshold: 0.6,
            turn_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub path: Option<String>,
    pub rotate_size: u64,
    pub rotate_keep: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
            rotate_size: 10 * 1024 * 1024,
            rotate_keep: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            default_provider = "work"

            [providers.work]
            backend = "azure"
            base_url = "https://example.openai.azure.com"
            api_version = "2024-02-15-preview"
            resilient = true

            [providers.anthropic]
            model = "claude-3-haiku-20240307"
            temperature = 0.2

            [interaction]
            turns = 6
            auto_end = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_provider.as_deref(), Some("work"));
        assert!(config.providers["work"].resilient);
        assert_eq!(config.providers["anthropic"].temperature, Some(0.2));
        assert_eq!(config.interaction.turns, 6);
        assert!(config.interaction.auto_end);
        assert_eq!(config.interaction.end_threshold, 0.6);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotate_keep, 5);
    }
}
