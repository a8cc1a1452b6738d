use anyhow::{Context, Result};
use epay_core::Selection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const APP_NAME: &str = "epay-bot";
const KEYCHAIN_SERVICE: &str = "by.expresspay.bot";

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_GATEWAY_TOKEN: &str = "EXPRESSPAY_TOKEN";
pub const ENV_GATEWAY_SECRET: &str = "EXPRESSPAY_SECRET";
pub const ENV_WEBHOOK_BASE_URL: &str = "WEBHOOK_BASE_URL";
pub const ENV_PORT: &str = "PORT";

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set (environment or keychain)")]
    Missing(&'static str),
    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub invoice: InvoiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Chat that receives a message for every accepted payment notification.
    #[serde(default)]
    pub notify_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: String, // "expresspay" | "mock"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            base_url: default_base_url(),
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceConfig {
    #[serde(default = "default_currency_code")]
    pub currency_code: u16,
    #[serde(default = "default_currency_label")]
    pub currency_label: String,
    /// Cosmetic merchant prefix shown before account numbers, e.g. `35077-1-`.
    #[serde(default)]
    pub account_display_prefix: String,
    #[serde(default = "default_info")]
    pub info: String,
    #[serde(default)]
    pub status_selection: Selection,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            currency_code: default_currency_code(),
            currency_label: default_currency_label(),
            account_display_prefix: String::new(),
            info: default_info(),
            status_selection: Selection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_sequence_file")]
    pub sequence_file: PathBuf,
    #[serde(default = "default_audit_file")]
    pub audit_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sequence_file: default_sequence_file(),
            audit_file: default_audit_file(),
        }
    }
}

fn default_provider_kind() -> String {
    "expresspay".to_string()
}

fn default_base_url() -> String {
    "https://api.express-pay.by/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_currency_code() -> u16 {
    933
}

fn default_currency_label() -> String {
    "BYN".to_string()
}

fn default_info() -> String {
    "Payment for services".to_string()
}

fn default_sequence_file() -> PathBuf {
    PathBuf::from("last_account.txt")
}

fn default_audit_file() -> PathBuf {
    PathBuf::from("payments.jsonl")
}

pub fn load() -> Result<AppConfig> {
    let cfg: AppConfig = confy::load(APP_NAME, None).context("Failed to load app config")?;
    Ok(cfg)
}

pub fn store(cfg: &AppConfig) -> Result<()> {
    confy::store(APP_NAME, None, cfg).context("Failed to store app config")?;
    Ok(())
}

/// Store a secret in the OS keychain
pub fn store_secret(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Credentials and listener settings supplied by the process environment.
#[derive(Clone)]
pub struct Runtime {
    pub bot_token: String,
    pub gateway_token: String,
    /// Empty when notifications are accepted without a signature check.
    pub gateway_secret: String,
    pub webhook_base_url: Option<String>,
    pub port: u16,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("bot_token", &"***")
            .field("gateway_token", &"***")
            .field("gateway_secret_set", &!self.gateway_secret.is_empty())
            .field("webhook_base_url", &self.webhook_base_url)
            .field("port", &self.port)
            .finish()
    }
}

impl Runtime {
    /// Environment first, then the OS keychain for the credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| keychain_key(key).and_then(|k| get_secret(k).ok()))
        })
    }

    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = value(ENV_BOT_TOKEN).ok_or(ConfigError::Missing(ENV_BOT_TOKEN))?;
        let gateway_token =
            value(ENV_GATEWAY_TOKEN).ok_or(ConfigError::Missing(ENV_GATEWAY_TOKEN))?;
        let gateway_secret = value(ENV_GATEWAY_SECRET).unwrap_or_default();
        let webhook_base_url =
            value(ENV_WEBHOOK_BASE_URL).map(|u| u.trim_end_matches('/').to_string());

        let port = match value(ENV_PORT) {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: ENV_PORT,
                value: raw,
            })?,
        };

        if gateway_secret.is_empty() {
            tracing::warn!(
                "{} not set; payment notifications will not be signature-checked",
                ENV_GATEWAY_SECRET
            );
        }

        Ok(Self {
            bot_token,
            gateway_token,
            gateway_secret,
            webhook_base_url,
            port,
        })
    }
}

fn keychain_key(env_key: &str) -> Option<&'static str> {
    match env_key {
        ENV_BOT_TOKEN => Some("telegram_bot_token"),
        ENV_GATEWAY_TOKEN => Some("expresspay_token"),
        ENV_GATEWAY_SECRET => Some("expresspay_secret"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn both_tokens_are_required() {
        let err = Runtime::resolve(env(&[(ENV_GATEWAY_TOKEN, "g")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_BOT_TOKEN));

        let err = Runtime::resolve(env(&[(ENV_BOT_TOKEN, "b"), (ENV_GATEWAY_TOKEN, "  ")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_GATEWAY_TOKEN));
    }

    #[test]
    fn optional_values_default() {
        let rt = Runtime::resolve(env(&[(ENV_BOT_TOKEN, "b"), (ENV_GATEWAY_TOKEN, "g")])).unwrap();
        assert_eq!(rt.port, DEFAULT_PORT);
        assert!(rt.gateway_secret.is_empty());
        assert!(rt.webhook_base_url.is_none());
    }

    #[test]
    fn port_and_base_url_are_read() {
        let rt = Runtime::resolve(env(&[
            (ENV_BOT_TOKEN, "b"),
            (ENV_GATEWAY_TOKEN, "g"),
            (ENV_GATEWAY_SECRET, "s3cret"),
            (ENV_WEBHOOK_BASE_URL, "https://bot.example.by/"),
            (ENV_PORT, "9000"),
        ]))
        .unwrap();
        assert_eq!(rt.port, 9000);
        assert_eq!(rt.gateway_secret, "s3cret");
        assert_eq!(rt.webhook_base_url.as_deref(), Some("https://bot.example.by"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Runtime::resolve(env(&[
            (ENV_BOT_TOKEN, "b"),
            (ENV_GATEWAY_TOKEN, "g"),
            (ENV_PORT, "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: ENV_PORT,
                value: "eighty".into()
            }
        );
    }

    #[test]
    fn defaults_fill_an_empty_config_file() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.provider.kind, "expresspay");
        assert_eq!(cfg.invoice.currency_code, 933);
        assert_eq!(cfg.invoice.status_selection, Selection::Last);
        assert_eq!(cfg.storage.sequence_file, PathBuf::from("last_account.txt"));
    }
}
