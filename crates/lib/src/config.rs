//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.sous/config.json`) and environment.
//! Credentials in the environment always win over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Completion API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Twilio WhatsApp sender settings.
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Conversation log database.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Chat-completions settings. The sampling parameters are fixed per deployment, not per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    /// API key. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API (default https://api.openai.com/v1).
    pub base_url: Option<String>,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_openai_model() -> String {
    "gpt-4".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.5
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_openai_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Twilio account and WhatsApp sender number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwilioConfig {
    /// Overridden by TWILIO_ACCOUNT_SID env.
    pub account_sid: Option<String>,
    /// Overridden by TWILIO_AUTH_TOKEN env.
    pub auth_token: Option<String>,
    /// Sender number, with or without the `whatsapp:` prefix. Overridden by TWILIO_NUMBER env.
    pub whatsapp_number: Option<String>,
    /// API root (default https://api.twilio.com).
    pub base_url: Option<String>,
}

/// Database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// sqlx SQLite URL (e.g. `sqlite:///var/lib/sous/conversations.db`). Overridden by DATABASE_URL env.
    /// Defaults to `conversations.db` next to the config file.
    pub url: Option<String>,
}

/// Twilio credentials once every piece has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub whatsapp_number: String,
}

/// Process environment lookup used by the `resolve_*` functions.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn config_non_empty(value: Option<&String>) -> Option<String> {
    non_empty(value.cloned())
}

/// Resolve the OpenAI API key: env OPENAI_API_KEY overrides config.
pub fn resolve_openai_api_key(config: &Config) -> Option<String> {
    resolve_openai_api_key_with(config, process_env)
}

/// [`resolve_openai_api_key`] with an explicit environment lookup.
pub fn resolve_openai_api_key_with(
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    non_empty(env("OPENAI_API_KEY")).or_else(|| config_non_empty(config.openai.api_key.as_ref()))
}

/// Resolve Twilio credentials; env TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN / TWILIO_NUMBER override config.
/// Returns None unless all three are present.
pub fn resolve_twilio_credentials(config: &Config) -> Option<TwilioCredentials> {
    resolve_twilio_credentials_with(config, process_env)
}

/// [`resolve_twilio_credentials`] with an explicit environment lookup.
pub fn resolve_twilio_credentials_with(
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Option<TwilioCredentials> {
    let account_sid = non_empty(env("TWILIO_ACCOUNT_SID"))
        .or_else(|| config_non_empty(config.twilio.account_sid.as_ref()))?;
    let auth_token = non_empty(env("TWILIO_AUTH_TOKEN"))
        .or_else(|| config_non_empty(config.twilio.auth_token.as_ref()))?;
    let whatsapp_number = non_empty(env("TWILIO_NUMBER"))
        .or_else(|| config_non_empty(config.twilio.whatsapp_number.as_ref()))?;
    Some(TwilioCredentials {
        account_sid,
        auth_token,
        whatsapp_number,
    })
}

/// Resolve the database URL: env DATABASE_URL, then config, then `conversations.db` beside the config file.
pub fn resolve_database_url(config: &Config, config_path: &Path) -> String {
    resolve_database_url_with(config, config_path, process_env)
}

/// [`resolve_database_url`] with an explicit environment lookup.
pub fn resolve_database_url_with(
    config: &Config,
    config_path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> String {
    non_empty(env("DATABASE_URL"))
        .or_else(|| config_non_empty(config.database.url.as_ref()))
        .unwrap_or_else(|| default_database_url(config_path))
}

/// `sqlite://<config dir>/conversations.db`.
pub fn default_database_url(config_path: &Path) -> String {
    format!("sqlite://{}", config_dir(config_path).join("conversations.db").display())
}

/// Directory holding the config file (`.` when the path has no parent).
pub fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SOUS_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".sous").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or SOUS_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the database location).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.openai.model, "gpt-4");
        assert_eq!(config.openai.max_tokens, 1000);
        assert_eq!(config.openai.temperature, 0.5);
    }

    #[test]
    fn parses_camel_case_sections_and_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 9000 },
                "openai": { "apiKey": "sk-file", "maxTokens": 200 },
                "twilio": { "accountSid": "AC1", "authToken": "tok", "whatsappNumber": "+14155238886" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "127.0.0.1");
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.openai.max_tokens, 200);
        assert_eq!(config.openai.model, "gpt-4");
        assert_eq!(config.twilio.whatsapp_number.as_deref(), Some("+14155238886"));
    }

    #[test]
    fn default_database_url_sits_beside_config() {
        let path = Path::new("/home/user/.sous/config.json");
        assert_eq!(
            default_database_url(path),
            "sqlite:///home/user/.sous/conversations.db"
        );
    }

    #[test]
    fn config_dir_of_bare_file_is_cwd() {
        assert_eq!(config_dir(Path::new("config.json")), Path::new("."));
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn twilio_config() -> Config {
        let mut config = Config::default();
        config.twilio.account_sid = Some("AC-file".to_string());
        config.twilio.auth_token = Some("tok".to_string());
        config.twilio.whatsapp_number = Some("+1".to_string());
        config
    }

    #[test]
    fn blank_config_values_do_not_resolve() {
        let mut config = twilio_config();
        config.twilio.account_sid = Some("  ".to_string());
        assert!(resolve_twilio_credentials_with(&config, no_env).is_none());
        assert!(resolve_openai_api_key_with(&config, no_env).is_none());
    }

    #[test]
    fn env_overrides_config_and_blank_env_is_ignored() {
        let config = twilio_config();
        let creds = resolve_twilio_credentials_with(&config, |key| match key {
            "TWILIO_ACCOUNT_SID" => Some(" AC-env ".to_string()),
            "TWILIO_AUTH_TOKEN" => Some("   ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.account_sid, "AC-env");
        assert_eq!(creds.auth_token, "tok");
        assert_eq!(creds.whatsapp_number, "+1");

        let key = resolve_openai_api_key_with(&config, |key| {
            (key == "OPENAI_API_KEY").then(|| "sk-env".to_string())
        });
        assert_eq!(key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn database_url_prefers_env_then_config_then_default() {
        let path = Path::new("/srv/sous/config.json");
        let mut config = Config::default();
        assert_eq!(
            resolve_database_url_with(&config, path, no_env),
            "sqlite:///srv/sous/conversations.db"
        );
        config.database.url = Some("sqlite:///data/file.db".to_string());
        assert_eq!(
            resolve_database_url_with(&config, path, no_env),
            "sqlite:///data/file.db"
        );
        assert_eq!(
            resolve_database_url_with(&config, path, |_| Some("sqlite::memory:".to_string())),
            "sqlite::memory:"
        );
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("sous-config-test-does-not-exist").join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 8000);
    }
}
