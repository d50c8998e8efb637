use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

pub const API_KEY_VAR: &str = "GROQ_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODELS: [&str; 3] = ["llama3-8b-8192", "llama3-70b-8192", "mixtral-8x7b-32768"];

/// Bounds for the "max new tokens" control.
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 64..=1024;
/// Bounds for the sampling temperature control.
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.5;

/// Model allow-list and generation defaults exposed to clients.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub models: Vec<String>,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
}

impl GenerationSettings {
    /// The first allow-listed model is the default selection.
    pub fn default_model(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or(DEFAULT_MODELS[0])
    }

    pub fn allows_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            default_max_tokens: 512,
            default_temperature: 0.7,
        }
    }
}

/// Application configuration loaded once at start-up.
/// Fails if no API key can be resolved from the secret store or the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub generation: GenerationSettings,
    pub llm_timeout_secs: u64,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let secrets_file = optional_env("SECRETS_FILE").unwrap_or_else(|| "secrets.env".to_string());
        let groq_api_key = resolve_api_key(Path::new(&secrets_file), optional_env(API_KEY_VAR))
            .ok_or_else(|| {
                anyhow!(
                    "Missing Groq API key. Add `{API_KEY_VAR}` to {secrets_file} or the environment."
                )
            })?;

        let defaults = GenerationSettings::default();
        let models = match optional_env("GROQ_MODELS") {
            Some(list) => parse_model_list(&list)?,
            None => defaults.models,
        };
        let generation = GenerationSettings {
            models,
            default_max_tokens: parse_env("DEFAULT_MAX_TOKENS", defaults.default_max_tokens)?,
            default_temperature: parse_env("DEFAULT_TEMPERATURE", defaults.default_temperature)?,
        };
        validate_defaults(&generation)?;

        Ok(Config {
            groq_api_key,
            groq_base_url: optional_env("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            generation,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)?,
            session_ttl_secs: parse_env("SESSION_TTL_SECS", 3600)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Resolves the API key: secret store first, environment value second.
/// Blank values count as missing.
pub fn resolve_api_key(secrets_file: &Path, env_value: Option<String>) -> Option<String> {
    read_secret(secrets_file, API_KEY_VAR)
        .or(env_value)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Reads one key from a dotenv-format secrets file without exporting it to the process env.
fn read_secret(path: &Path, key: &str) -> Option<String> {
    let entries = dotenvy::from_path_iter(path).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
        .filter(|value| !value.trim().is_empty())
}

fn parse_model_list(raw: &str) -> Result<Vec<String>> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();
    if models.is_empty() {
        bail!("GROQ_MODELS must list at least one model");
    }
    Ok(models)
}

fn validate_defaults(settings: &GenerationSettings) -> Result<()> {
    if !MAX_TOKENS_RANGE.contains(&settings.default_max_tokens) {
        bail!(
            "DEFAULT_MAX_TOKENS must be between {} and {}",
            MAX_TOKENS_RANGE.start(),
            MAX_TOKENS_RANGE.end()
        );
    }
    if !TEMPERATURE_RANGE.contains(&settings.default_temperature) {
        bail!(
            "DEFAULT_TEMPERATURE must be between {} and {}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        );
    }
    Ok(())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
