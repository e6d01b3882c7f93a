//! Typed configuration for all scriba components.
//!
//! Every component receives an explicit config struct built here; there is
//! no ambient global configuration. `from_env()` constructors read the
//! documented environment variables once at startup (after `dotenvy` has
//! loaded any `.env` file) and clamp numeric values into sane ranges,
//! warning when input is out of bounds.

use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

use crate::defaults;
use crate::error::{Error, Result};

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a yes/no style flag. Accepts `yes`, `true`, and `1` as true.
fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "yes" | "true" | "1")
}

fn env_flag(name: &str, default: bool) -> bool {
    env_var(name).map(|v| parse_flag(&v)).unwrap_or(default)
}

/// Parse a numeric environment variable, clamping into `[min, max]`.
/// Invalid input falls back to the default with a warning.
fn env_clamped<T>(name: &str, default: T, min: T, max: T) -> T
where
    T: FromStr + PartialOrd + Copy + Display,
{
    let Some(raw) = env_var(name) else {
        return default;
    };
    let Ok(value) = raw.parse::<T>() else {
        warn!("Invalid value {:?} for {}, using default {}", raw, name, default);
        return default;
    };
    if value < min {
        warn!("{}={} is below minimum {}, using {}", name, value, min, min);
        return min;
    }
    if value > max {
        warn!("{}={} is above maximum {}, using {}", name, value, max, max);
        return max;
    }
    value
}

// =============================================================================
// PROVIDER SELECTION
// =============================================================================

/// Which AI completion provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// The hosted OpenAI API.
    OpenAi,
    /// A local Ollama instance.
    Ollama,
    /// Any OpenAI-compatible endpoint configured via `CUSTOM_*` variables.
    Custom,
}

impl ProviderKind {
    /// Parse `AI_PROVIDER`. Unknown values fall back to OpenAI with a
    /// warning rather than refusing to start.
    pub fn from_env() -> Self {
        match env_var("AI_PROVIDER").as_deref() {
            Some("ollama") => Self::Ollama,
            Some("custom") => Self::Custom,
            Some("openai") | None => Self::OpenAi,
            Some(other) => {
                warn!("AI provider {:?} not supported, defaulting to OpenAI", other);
                Self::OpenAi
            }
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

// =============================================================================
// COMPONENT CONFIGS
// =============================================================================

/// Document store connection settings.
///
/// | Variable | Description |
/// |----------|-------------|
/// | `DMS_BASE_URL` | Base URL of the document store API (required) |
/// | `DMS_API_TOKEN` | API token for the service user (required) |
#[derive(Debug, Clone)]
pub struct DmsConfig {
    pub base_url: String,
    pub api_token: String,
}

impl DmsConfig {
    pub fn from_env() -> Result<Self> {
        let base_url = env_var("DMS_BASE_URL")
            .ok_or_else(|| Error::Config("DMS_BASE_URL is not set".to_string()))?;
        let api_token = env_var("DMS_API_TOKEN")
            .ok_or_else(|| Error::Config("DMS_API_TOKEN is not set".to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

/// Ledger database settings.
///
/// | Variable | Description |
/// |----------|-------------|
/// | `DATABASE_URL` | PostgreSQL connection URL (required) |
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub database_url: String,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env_var("DATABASE_URL")
            .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?;
        Ok(Self { database_url })
    }
}

/// Ollama backend settings, including sampling parameters.
///
/// | Variable | Default | Range |
/// |----------|---------|-------|
/// | `OLLAMA_BASE_URL` | `http://localhost:11434` | |
/// | `OLLAMA_MODEL` | `llama3.2` | |
/// | `OLLAMA_MAX_CTX` | 128000 | 1024..=500000 |
/// | `OLLAMA_EXPECTED_RESPONSE_TOKENS` | 1024 | 64..=4096 |
/// | `OLLAMA_TEMPERATURE` | 0.7 | 0.1..=1.0 |
/// | `OLLAMA_TOP_P` | 0.9 | 0.1..=1.0 |
/// | `OLLAMA_REPEAT_PENALTY` | 1.1 | 0.0..=2.0 |
/// | `OLLAMA_TOP_K` | 7 | 1..=100 |
/// | `OLLAMA_NUM_PREDICT` | 256 | 64..=2048 |
/// | `OLLAMA_TIMEOUT_SECS` | 1200 | |
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub max_ctx: usize,
    pub expected_response_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub top_k: u32,
    pub num_predict: u32,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            model: defaults::OLLAMA_MODEL.to_string(),
            max_ctx: defaults::OLLAMA_MAX_CTX,
            expected_response_tokens: defaults::OLLAMA_EXPECTED_RESPONSE_TOKENS,
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.1,
            top_k: 7,
            num_predict: 256,
            timeout_secs: defaults::OLLAMA_TIMEOUT_SECS,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_var("OLLAMA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| defaults::OLLAMA_URL.to_string()),
            model: env_var("OLLAMA_MODEL").unwrap_or_else(|| defaults::OLLAMA_MODEL.to_string()),
            max_ctx: env_clamped("OLLAMA_MAX_CTX", defaults::OLLAMA_MAX_CTX, 1024, 500_000),
            expected_response_tokens: env_clamped(
                "OLLAMA_EXPECTED_RESPONSE_TOKENS",
                defaults::OLLAMA_EXPECTED_RESPONSE_TOKENS,
                64,
                4096,
            ),
            temperature: env_clamped("OLLAMA_TEMPERATURE", 0.7, 0.1, 1.0),
            top_p: env_clamped("OLLAMA_TOP_P", 0.9, 0.1, 1.0),
            repeat_penalty: env_clamped("OLLAMA_REPEAT_PENALTY", 1.1, 0.0, 2.0),
            top_k: env_clamped("OLLAMA_TOP_K", 7, 1, 100),
            num_predict: env_clamped("OLLAMA_NUM_PREDICT", 256, 64, 2048),
            timeout_secs: env_clamped("OLLAMA_TIMEOUT_SECS", defaults::OLLAMA_TIMEOUT_SECS, 30, 7200),
        }
    }
}

/// OpenAI-compatible backend settings. Also used for the `custom` provider,
/// which is the same wire protocol against a different base URL.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Model context window in tokens.
    pub max_context_tokens: usize,
    /// Tokens reserved for the response when budgeting the prompt.
    pub response_reserve_tokens: usize,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            model: defaults::OPENAI_MODEL.to_string(),
            max_context_tokens: defaults::OPENAI_MAX_CONTEXT_TOKENS,
            response_reserve_tokens: defaults::OPENAI_RESPONSE_RESERVE_TOKENS,
            temperature: defaults::OPENAI_TEMPERATURE,
            timeout_secs: defaults::OPENAI_TIMEOUT_SECS,
        }
    }
}

impl OpenAiConfig {
    /// Hosted OpenAI settings from `OPENAI_*` variables.
    pub fn from_env() -> Self {
        Self {
            base_url: env_var("OPENAI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| defaults::OPENAI_URL.to_string()),
            api_key: env_var("OPENAI_API_KEY"),
            model: env_var("OPENAI_MODEL").unwrap_or_else(|| defaults::OPENAI_MODEL.to_string()),
            max_context_tokens: env_clamped(
                "OPENAI_MAX_CONTEXT_TOKENS",
                defaults::OPENAI_MAX_CONTEXT_TOKENS,
                2048,
                2_000_000,
            ),
            response_reserve_tokens: env_clamped(
                "OPENAI_RESPONSE_RESERVE_TOKENS",
                defaults::OPENAI_RESPONSE_RESERVE_TOKENS,
                64,
                32_768,
            ),
            temperature: env_clamped("OPENAI_TEMPERATURE", defaults::OPENAI_TEMPERATURE, 0.0, 2.0),
            timeout_secs: env_clamped("OPENAI_TIMEOUT_SECS", defaults::OPENAI_TIMEOUT_SECS, 30, 7200),
        }
    }

    /// OpenAI-compatible "custom" endpoint settings from `CUSTOM_*`
    /// variables, sharing the hosted defaults for budgets and sampling.
    pub fn custom_from_env() -> Result<Self> {
        let base_url = env_var("CUSTOM_BASE_URL")
            .ok_or_else(|| Error::Config("CUSTOM_BASE_URL is not set".to_string()))?;
        let model = env_var("CUSTOM_MODEL")
            .ok_or_else(|| Error::Config("CUSTOM_MODEL is not set".to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: env_var("CUSTOM_API_KEY"),
            model,
            ..Self::from_env()
        })
    }
}

/// Per-field activation flags. A disabled field is left untouched on the
/// document, preserving whatever value the store already holds.
///
/// | Variable | Default |
/// |----------|---------|
/// | `ACTIVATE_TAGGING` | yes |
/// | `ACTIVATE_CORRESPONDENTS` | yes |
/// | `ACTIVATE_DOCUMENT_TYPE` | yes |
/// | `ACTIVATE_TITLE` | yes |
#[derive(Debug, Clone, Copy)]
pub struct FieldToggles {
    pub tagging: bool,
    pub correspondents: bool,
    pub document_types: bool,
    pub titles: bool,
}

impl Default for FieldToggles {
    fn default() -> Self {
        Self {
            tagging: true,
            correspondents: true,
            document_types: true,
            titles: true,
        }
    }
}

impl FieldToggles {
    pub fn from_env() -> Self {
        Self {
            tagging: env_flag("ACTIVATE_TAGGING", true),
            correspondents: env_flag("ACTIVATE_CORRESPONDENTS", true),
            document_types: env_flag("ACTIVATE_DOCUMENT_TYPE", true),
            titles: env_flag("ACTIVATE_TITLE", true),
        }
    }
}

/// Prompt construction settings shared by every provider.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SYSTEM_PROMPT` | built-in | Analysis instructions |
/// | `USE_EXISTING_DATA` | yes | List existing taxonomy in the prompt |
/// | `USE_PROMPT_TAGS` | no | Constrain the model to a fixed tag list |
/// | `PROMPT_TAGS` | | Comma-separated fixed tag vocabulary |
#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Override for the built-in analysis instructions.
    pub system_prompt: Option<String>,
    /// Surface the store's existing tags/correspondents to the model so it
    /// prefers reusing them.
    pub use_existing_data: bool,
    /// Constrain the model to `prompt_tags` instead of inventing tags.
    pub use_prompt_tags: bool,
    pub prompt_tags: Vec<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            use_existing_data: true,
            use_prompt_tags: false,
            prompt_tags: Vec::new(),
        }
    }
}

impl PromptConfig {
    pub fn from_env() -> Self {
        let prompt_tags = env_var("PROMPT_TAGS")
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            system_prompt: env_var("SYSTEM_PROMPT"),
            use_existing_data: env_flag("USE_EXISTING_DATA", true),
            use_prompt_tags: env_flag("USE_PROMPT_TAGS", false),
            prompt_tags,
        }
    }
}

/// Scan scheduling settings.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SCAN_INTERVAL` | `*/30 * * * *` | Five-field cron expression |
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub schedule: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            schedule: defaults::SCAN_SCHEDULE.to_string(),
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Self {
        Self {
            schedule: env_var("SCAN_INTERVAL")
                .unwrap_or_else(|| defaults::SCAN_SCHEDULE.to_string()),
        }
    }
}

// =============================================================================
// AGGREGATE
// =============================================================================

/// Complete service configuration, loaded once in `main` and handed to each
/// component's constructor.
#[derive(Debug, Clone)]
pub struct ScribaConfig {
    pub provider: ProviderKind,
    pub dms: DmsConfig,
    pub ledger: LedgerConfig,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
    /// Settings for the `custom` provider; only present when configured.
    pub custom: Option<OpenAiConfig>,
    pub scan: ScanConfig,
    pub toggles: FieldToggles,
    pub prompt: PromptConfig,
    /// HTTP bind address (`SCRIBA_BIND`).
    pub bind_addr: String,
}

impl ScribaConfig {
    pub fn from_env() -> Result<Self> {
        let provider = ProviderKind::from_env();
        let custom = match OpenAiConfig::custom_from_env() {
            Ok(cfg) => Some(cfg),
            // The custom variables are only required when the custom
            // provider is selected.
            Err(e) if provider == ProviderKind::Custom => return Err(e),
            Err(_) => None,
        };
        Ok(Self {
            provider,
            dms: DmsConfig::from_env()?,
            ledger: LedgerConfig::from_env()?,
            ollama: OllamaConfig::from_env(),
            openai: OpenAiConfig::from_env(),
            custom,
            scan: ScanConfig::from_env(),
            toggles: FieldToggles::from_env(),
            prompt: PromptConfig::from_env(),
            bind_addr: env_var("SCRIBA_BIND").unwrap_or_else(|| defaults::BIND_ADDR.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_variants() {
        assert!(parse_flag("yes"));
        assert!(parse_flag("YES"));
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn test_env_clamped_bounds() {
        // No env var set: default wins.
        std::env::remove_var("SCRIBA_TEST_CLAMP");
        assert_eq!(env_clamped("SCRIBA_TEST_CLAMP", 10u32, 1, 100), 10);

        std::env::set_var("SCRIBA_TEST_CLAMP", "500");
        assert_eq!(env_clamped("SCRIBA_TEST_CLAMP", 10u32, 1, 100), 100);

        std::env::set_var("SCRIBA_TEST_CLAMP", "0");
        assert_eq!(env_clamped("SCRIBA_TEST_CLAMP", 10u32, 1, 100), 1);

        std::env::set_var("SCRIBA_TEST_CLAMP", "not-a-number");
        assert_eq!(env_clamped("SCRIBA_TEST_CLAMP", 10u32, 1, 100), 10);

        std::env::remove_var("SCRIBA_TEST_CLAMP");
    }

    #[test]
    fn test_ollama_defaults() {
        let cfg = OllamaConfig::default();
        assert_eq!(cfg.base_url, "http://localhost:11434");
        assert_eq!(cfg.max_ctx, 128_000);
        assert_eq!(cfg.num_predict, 256);
    }

    #[test]
    fn test_field_toggles_default_on() {
        let toggles = FieldToggles::default();
        assert!(toggles.tagging && toggles.correspondents && toggles.document_types && toggles.titles);
    }
}
