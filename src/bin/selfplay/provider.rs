use std::env;

use anyhow::Context;
use selfplay::builder::{LLMBackend, LLMBuilder};
use selfplay::ChatProvider;

use crate::config::{AppConfig, ProviderConfig};

const FALLBACK_PROVIDER: &str = "openai";
const AZURE_ENDPOINT_ENV: &str = "AZURE_OPENAI_API_ENDPOINT";
const AZURE_VERSION_ENV: &str = "AZURE_OPENAI_API_VERSION";

/// A `--provider` value: `name` or `name:model`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub name: String,
    pub model: Option<String>,
}

impl ProviderSelection {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((name, model)) if !model.trim().is_empty() => Self {
                name: name.trim().to_string(),
                model: Some(model.trim().to_string()),
            },
            Some((name, _)) => Self {
                name: name.trim().to_string(),
                model: None,
            },
            None => Self {
                name: raw.trim().to_string(),
                model: None,
            },
        }
    }
}

/// Everything the builder needs, after merging the config entry, the
/// command line and the environment.
#[derive(Debug, Clone, Default)]
struct ResolvedConfig {
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_seconds: Option<u64>,
    api_version: Option<String>,
    deployment_id: Option<String>,
    region: Option<String>,
    resilient: bool,
}

impl ResolvedConfig {
    fn apply(&self, mut builder: LLMBuilder) -> LLMBuilder {
        if let Some(value) = self.model.clone() {
            builder = builder.model(value);
        }
        if let Some(value) = self.api_key.clone() {
            builder = builder.api_key(value);
        }
        if let Some(value) = self.base_url.clone() {
            builder = builder.base_url(value);
        }
        if let Some(value) = self.temperature {
            builder = builder.temperature(value);
        }
        if let Some(value) = self.max_tokens {
            builder = builder.max_tokens(value);
        }
        if let Some(value) = self.timeout_seconds {
            builder = builder.timeout_seconds(value);
        }
        if let Some(value) = self.api_version.clone() {
            builder = builder.api_version(value);
        }
        if let Some(value) = self.deployment_id.clone() {
            builder = builder.deployment_id(value);
        }
        if let Some(value) = self.region.clone() {
            builder = builder.region(value);
        }
        builder.resilient(self.resilient)
    }
}

fn resolve(
    selection: &ProviderSelection,
    model_override: Option<&str>,
    config: &AppConfig,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<(LLMBackend, ResolvedConfig)> {
    let entry = config.providers.get(&selection.name);
    let defaults = ProviderConfig::default();
    let entry = entry.unwrap_or(&defaults);

    let backend_name = entry.backend.as_deref().unwrap_or(&selection.name);
    let backend: LLMBackend = backend_name.parse().with_context(|| {
        format!(
            "'{}' is neither a configured provider nor a known backend",
            selection.name
        )
    })?;

    let api_key = entry
        .api_key
        .clone()
        .or_else(|| entry.api_key_env.as_deref().and_then(&lookup_env))
        .or_else(|| backend.api_key_env().and_then(&lookup_env));

    let mut resolved = ResolvedConfig {
        model: model_override
            .map(str::to_string)
            .or_else(|| selection.model.clone())
            .or_else(|| entry.model.clone()),
        api_key,
        base_url: entry.base_url.clone(),
        temperature: entry.temperature,
        max_tokens: entry.max_tokens,
        timeout_seconds: entry.timeout_seconds,
        api_version: entry.api_version.clone(),
        deployment_id: entry.deployment_id.clone(),
        region: entry.region.clone(),
        resilient: entry.resilient,
    };

    if backend == LLMBackend::AzureOpenAI {
        if resolved.base_url.is_none() {
            resolved.base_url = lookup_env(AZURE_ENDPOINT_ENV);
        }
        if resolved.api_version.is_none() {
            resolved.api_version = lookup_env(AZURE_VERSION_ENV);
        }
    }

    Ok((backend, resolved))
}

/// Builds the provider named by `selection` (or the configured default).
/// `--model` beats the `name:model` form, which beats the config entry.
pub fn build_provider(
    selection: Option<&str>,
    model_override: Option<&str>,
    config: &AppConfig,
) -> anyhow::Result<Box<dyn ChatProvider>> {
    let raw = selection
        .or(config.default_provider.as_deref())
        .unwrap_or(FALLBACK_PROVIDER);
    let selection = ProviderSelection::parse(raw);
    let (backend, resolved) = resolve(&selection, model_override, config, |key| {
        env::var(key).ok().filter(|value| !value.is_empty())
    })?;
    log::info!(
        "Building {} provider '{}' (model {})",
        backend,
        selection.name,
        resolved.model.as_deref().unwrap_or("default")
    );
    resolved
        .apply(LLMBuilder::new().backend(backend))
        .build()
        .with_context(|| format!("failed to build provider '{}'", selection.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_name_and_model() {
        assert_eq!(
            ProviderSelection::parse("anthropic:claude-3-haiku"),
            ProviderSelection {
                name: "anthropic".to_string(),
                model: Some("claude-3-haiku".to_string())
            }
        );
        assert_eq!(ProviderSelection::parse("openai:").model, None);
        assert_eq!(ProviderSelection::parse("google").name, "google");
    }

    #[test]
    fn plain_backend_reads_its_key_from_env() {
        let selection = ProviderSelection::parse("openai:gpt-4o-mini");
        let (backend, resolved) = resolve(
            &selection,
            None,
            &AppConfig::default(),
            env_from(&[("OPENAI_API_KEY", "sk-env")]),
        )
        .unwrap();
        assert_eq!(backend, LLMBackend::OpenAI);
        assert_eq!(resolved.api_key.as_deref(), Some("sk-env"));
        assert_eq!(resolved.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn configured_entry_wins_over_env_and_model_flag_wins_over_entry() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "work".to_string(),
            ProviderConfig {
                backend: Some("anthropic".to_string()),
                api_key_env: Some("WORK_KEY".to_string()),
                model: Some("claude-3-haiku".to_string()),
                ..ProviderConfig::default()
            },
        );
        let (backend, resolved) = resolve(
            &ProviderSelection::parse("work"),
            Some("claude-3-opus"),
            &config,
            env_from(&[("WORK_KEY", "from-work"), ("ANTHROPIC_API_KEY", "generic")]),
        )
        .unwrap();
        assert_eq!(backend, LLMBackend::Anthropic);
        assert_eq!(resolved.api_key.as_deref(), Some("from-work"));
        assert_eq!(resolved.model.as_deref(), Some("claude-3-opus"));
    }

    #[test]
    fn azure_endpoint_and_version_come_from_env() {
        let (_, resolved) = resolve(
            &ProviderSelection::parse("azure"),
            None,
            &AppConfig::default(),
            env_from(&[
                ("AZURE_OPENAI_API_KEY", "az"),
                (AZURE_ENDPOINT_ENV, "https://example.openai.azure.com"),
                (AZURE_VERSION_ENV, "2024-02-15-preview"),
            ]),
        )
        .unwrap();
        assert_eq!(
            resolved.base_url.as_deref(),
            Some("https://example.openai.azure.com")
        );
        assert_eq!(resolved.api_version.as_deref(), Some("2024-02-15-preview"));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = resolve(
            &ProviderSelection::parse("mystery"),
            None,
            &AppConfig::default(),
            env_from(&[]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }
}
