use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlanError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,

    // API Settings
    pub api_bind_addr: String,
    pub cors_allowed_origins: String,

    // AI Provider Settings
    pub selected_ai: String,
    #[serde(default)]
    pub open_ai_api_key: String,
    pub open_ai_base_url: String,
    pub open_ai_model: String,
    pub open_ai_timeout_secs: u64,
    #[serde(default)]
    pub deepseek_ai_api_key: String,
    pub deepseek_base_url: String,
    pub deepseek_model: String,
    pub deepseek_timeout_secs: u64,
    pub ai_max_retries: u32,
    pub ai_retry_base_delay_ms: u64,
    pub fitness_debug_prompt: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "fit_ai.db".to_string(),
            api_bind_addr: "0.0.0.0:8080".to_string(),
            cors_allowed_origins: "*".to_string(),
            selected_ai: "OPEN_AI".to_string(),
            open_ai_api_key: "".to_string(),
            open_ai_base_url: "https://api.openai.com/v1".to_string(),
            open_ai_model: "gpt-4".to_string(),
            open_ai_timeout_secs: 120,
            deepseek_ai_api_key: "".to_string(),
            deepseek_base_url: "https://api.deepseek.com/v1".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            deepseek_timeout_secs: 90,
            ai_max_retries: 0,
            ai_retry_base_delay_ms: 500,
            fitness_debug_prompt: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("FitAi.toml"))
            .merge(Json::file("FitAi.json"))
            .merge(Env::raw().only(&[
                "DATABASE_URL",
                "API_BIND_ADDR",
                "CORS_ALLOWED_ORIGINS",
                "SELECTED_AI",
                "OPEN_AI_API_KEY",
                "OPEN_AI_BASE_URL",
                "OPEN_AI_MODEL",
                "OPEN_AI_TIMEOUT_SECS",
                "DEEPSEEK_AI_API_KEY",
                "DEEPSEEK_BASE_URL",
                "DEEPSEEK_MODEL",
                "DEEPSEEK_TIMEOUT_SECS",
                "AI_MAX_RETRIES",
                "AI_RETRY_BASE_DELAY_MS",
                "FITNESS_DEBUG_PROMPT",
            ]))
    }

    pub fn provider_config(&self) -> Result<ProviderConfig, PlanError> {
        Ok(ProviderConfig {
            selected: ProviderKind::parse(&self.selected_ai)?,
            open_ai: BackendConfig {
                api_key: non_empty(&self.open_ai_api_key),
                base_url: self.open_ai_base_url.trim_end_matches('/').to_string(),
                model: self.open_ai_model.clone(),
                timeout: Duration::from_secs(self.open_ai_timeout_secs),
            },
            deepseek: BackendConfig {
                api_key: non_empty(&self.deepseek_ai_api_key),
                base_url: self.deepseek_base_url.trim_end_matches('/').to_string(),
                model: self.deepseek_model.clone(),
                timeout: Duration::from_secs(self.deepseek_timeout_secs),
            },
            max_retries: self.ai_max_retries,
            retry_base_delay: Duration::from_millis(self.ai_retry_base_delay_ms),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        match raw.trim().to_uppercase().as_str() {
            "" | "OPEN_AI" | "OPENAI" => Ok(ProviderKind::OpenAi),
            "DEEPSEEK" => Ok(ProviderKind::DeepSeek),
            other => Err(PlanError::Config(format!(
                "unsupported AI provider '{}' (expected OPEN_AI or DEEPSEEK)",
                other
            ))),
        }
    }

    pub fn key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPEN_AI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_AI_API_KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub selected: ProviderKind,
    pub open_ai: BackendConfig,
    pub deepseek: BackendConfig,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl ProviderConfig {
    pub fn active(&self) -> &BackendConfig {
        match self.selected {
            ProviderKind::OpenAi => &self.open_ai,
            ProviderKind::DeepSeek => &self.deepseek,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_is_case_insensitive() {
        assert_eq!(ProviderKind::parse("deepseek").unwrap(), ProviderKind::DeepSeek);
        assert_eq!(ProviderKind::parse("").unwrap(), ProviderKind::OpenAi);
        assert!(matches!(
            ProviderKind::parse("claude"),
            Err(PlanError::Config(_))
        ));
    }

    #[test]
    fn defaults_match_backend_contracts() {
        let providers = AppConfig::default().provider_config().unwrap();
        assert_eq!(providers.selected, ProviderKind::OpenAi);
        assert_eq!(providers.open_ai.timeout, Duration::from_secs(120));
        assert_eq!(providers.deepseek.timeout, Duration::from_secs(90));
        assert!(providers.active().api_key.is_none());
        assert_eq!(providers.max_retries, 0);
    }

    #[test]
    fn env_overrides_file_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("FitAi.toml", "deepseek_timeout_secs = 30\nselected_ai = \"OPEN_AI\"")?;
            jail.set_env("SELECTED_AI", "deepseek");
            jail.set_env("DEEPSEEK_AI_API_KEY", "sk-ds");

            let config: AppConfig = AppConfig::figment().extract()?;
            let providers = config.provider_config().expect("valid provider");
            assert_eq!(providers.selected, ProviderKind::DeepSeek);
            assert_eq!(providers.active().api_key.as_deref(), Some("sk-ds"));
            assert_eq!(providers.active().timeout, Duration::from_secs(30));
            Ok(())
        });
    }
}
