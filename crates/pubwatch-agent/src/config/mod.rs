//! Configuration loading for pubwatch.
//! Reads pubwatch.toml from the current directory or path in PUBWATCH_CONFIG env var.
//! Credentials come from the environment only (see [`Secrets`]).

use pubwatch_ingestion::pipeline::CommitPolicy;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const GENAI_KEY_VAR: &str = "GOOGLE_GENAI_API_KEY";
pub const MAIL_PASSWORD_VAR: &str = "GOOGLE_EMAIL_APPWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub artifact: ArtifactConfig,
    pub llm: LlmConfig,
    pub mail: MailConfig,
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_catalog_url() -> String { "https://inspirehep.net/api/literature".to_string() }
fn default_author()      -> String { "Joseph.Karpie.1".to_string() }
fn default_sort()        -> String { "mostrecent".to_string() }
fn default_page_size()   -> usize  { 250 }
fn default_user_agent()  -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/58.0.3029.110 Safari/537.3"
        .to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            author: default_author(),
            sort: default_sort(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_artifact_url() -> String { "https://arxiv.org/pdf/".to_string() }
fn default_timeout_secs() -> u64    { 60 }

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self { base_url: default_artifact_url(), timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model()             -> String { "gemini-1.5-flash".to_string() }
fn default_llm_url()           -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_max_output_tokens() -> u32    { 8192 }
fn default_temperature()       -> f32    { 0.7 }
fn default_llm_timeout_secs()  -> u64    { 300 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_llm_url(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Sender address; also the SMTP login.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_display_name")]
    pub author_display_name: String,
}

fn default_smtp_host()    -> String { "smtp.gmail.com".to_string() }
fn default_smtp_port()    -> u16    { 587 }
fn default_display_name() -> String { "Joseph".to_string() }

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from: String::new(),
            to: String::new(),
            author_display_name: default_display_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: String,
    #[serde(default)]
    pub commit_policy: CommitPolicy,
}

fn default_state_path() -> String { "previous_publications.csv".to_string() }

impl Default for StateConfig {
    fn default() -> Self {
        Self { path: default_state_path(), commit_policy: CommitPolicy::default() }
    }
}

mod tests;

impl Config {
    /// Load configuration from pubwatch.toml.
    /// Checks PUBWATCH_CONFIG env var first, then current directory.
    /// A missing file yields the built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("PUBWATCH_CONFIG")
            .unwrap_or_else(|_| "pubwatch.toml".to_string());

        if !Path::new(&path).exists() {
            tracing::warn!(
                "Config file not found: {path}; using built-in defaults. \
                 Copy pubwatch.example.toml to pubwatch.toml and edit it."
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject settings that would only fail later, mid-run.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mail.from.trim().is_empty() {
            anyhow::bail!("mail.from is not set");
        }
        if self.mail.to.trim().is_empty() {
            anyhow::bail!("mail.to is not set");
        }
        if self.catalog.author.trim().is_empty() {
            anyhow::bail!("catalog.author is not set");
        }
        if self.catalog.page_size == 0 {
            anyhow::bail!("catalog.page_size must be at least 1");
        }
        Ok(())
    }
}

/// Credentials read from the process environment.
pub struct Secrets {
    pub genai_api_key: SecretString,
    pub mail_password: SecretString,
}

impl Secrets {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let require = |name: &str| -> anyhow::Result<SecretString> {
            match lookup(name) {
                Some(v) if !v.trim().is_empty() => Ok(SecretString::from(v)),
                _ => anyhow::bail!("environment variable {name} is not set"),
            }
        };
        Ok(Self {
            genai_api_key: require(GENAI_KEY_VAR)?,
            mail_password: require(MAIL_PASSWORD_VAR)?,
        })
    }
}
