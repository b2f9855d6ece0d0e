use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for a pipeline run.
///
/// Every section falls back to its defaults, so an empty or partial
/// `config.yaml` is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    pub demo: DemoConfig,
}

/// Which backend produces embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Ollama HTTP API (`/api/embed`)
    #[default]
    Ollama,
    /// Offline token hashing, no model server needed
    Hashing,
}

impl EmbeddingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Hashing => "hashing",
        }
    }
}

/// Configuration for the embedding function bound to collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Model name as known to the provider (ignored by `hashing`)
    pub model: String,
    pub base_url: String,
    /// Length of the vectors the model produces
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            // Ollama's packaging of sentence-transformers/all-MiniLM-L6-v2
            model: "all-minilm".to_string(),
            base_url: "http://localhost:11434".to_string(),
            dimension: 384,
        }
    }
}

/// Distance metric a collection ranks neighbors by.
///
/// Fixed when the collection is created and recorded alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Squared euclidean distance
    #[default]
    L2,
    /// `1 - cosine similarity`
    Cosine,
    /// `1 - dot product`
    Ip,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::L2 => "l2",
            Distance::Cosine => "cosine",
            Distance::Ip => "ip",
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distance {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "l2" => Ok(Distance::L2),
            "cosine" => Ok(Distance::Cosine),
            "ip" => Ok(Distance::Ip),
            other => Err(ConfigError::Invalid(format!("unknown distance '{}'", other))),
        }
    }
}

/// Storage configuration for the embedded vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory the vector database persists into
    pub path: String,
    pub collection_name: String,
    /// Metric used when a collection is first created
    pub distance: Distance,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./minirag_db".to_string(),
            collection_name: "my_rag_collection".to_string(),
            distance: Distance::default(),
        }
    }
}

/// Settings for the end-to-end demonstration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub query: String,
    pub top_k: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            query: "What is the tallest mountain?".to_string(),
            top_k: 1,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, otherwise use defaults.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid("embedding.dimension must be positive".to_string()));
        }

        if self.embedding.provider == EmbeddingProvider::Ollama {
            if self.embedding.model.trim().is_empty() {
                return Err(ConfigError::Invalid("embedding.model cannot be empty".to_string()));
            }
            if !self.embedding.base_url.starts_with("http://")
                && !self.embedding.base_url.starts_with("https://")
            {
                return Err(ConfigError::Invalid(
                    "embedding.base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.demo.top_k == 0 {
            return Err(ConfigError::Invalid("demo.top_k must be positive".to_string()));
        }

        Ok(())
    }
}
