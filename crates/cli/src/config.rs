//! Configuration loading from nova.toml.
//!
//! Secrets may live in the file or in the environment; the environment
//! wins only when the file says nothing.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub places: PlacesConfig,

    #[serde(default)]
    pub pubmed: PubMedConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Model backend configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI API key; falls back to the OPENAI_API_KEY environment
    /// variable.
    pub api_key: Option<String>,

    /// Chat-completions endpoint override (for compatible providers).
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Iteration ceiling per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite contact database.
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct PlacesConfig {
    /// Google Places API key; falls back to GOOGLE_MAPS_API_KEY.
    pub api_key: Option<String>,

    /// Cap on practitioners returned per search.
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,
}

#[derive(Debug, Deserialize)]
pub struct PubMedConfig {
    /// Contact email sent to NCBI (required by their usage policy);
    /// falls back to ENTREZ_EMAIL.
    pub email: Option<String>,

    /// NCBI API key for higher rate limits; falls back to NCBI_API_KEY.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Dashboard bind address.
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_iterations() -> u32 {
    5
}

fn default_store_path() -> String {
    "data/hcps.db".to_string()
}

fn default_result_cap() -> usize {
    5
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            result_cap: default_result_cap(),
        }
    }
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The OpenAI API key, from file or environment.
    pub fn openai_api_key(&self) -> Result<String, ConfigError> {
        self.backend
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(ConfigError::MissingKey("backend.api_key / OPENAI_API_KEY"))
    }

    /// The Google Places API key, from file or environment.
    pub fn places_api_key(&self) -> Result<String, ConfigError> {
        self.places
            .api_key
            .clone()
            .or_else(|| std::env::var("GOOGLE_MAPS_API_KEY").ok())
            .ok_or(ConfigError::MissingKey(
                "places.api_key / GOOGLE_MAPS_API_KEY",
            ))
    }

    /// The NCBI contact email, from file or environment.
    pub fn entrez_email(&self) -> Result<String, ConfigError> {
        self.pubmed
            .email
            .clone()
            .or_else(|| std::env::var("ENTREZ_EMAIL").ok())
            .ok_or(ConfigError::MissingKey("pubmed.email / ENTREZ_EMAIL"))
    }

    /// The NCBI API key, if configured anywhere.
    pub fn ncbi_api_key(&self) -> Option<String> {
        self.pubmed
            .api_key
            .clone()
            .or_else(|| std::env::var("NCBI_API_KEY").ok())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("missing configuration: set {0}")]
    MissingKey(&'static str),
}
