
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const INDEX_FILE_NAME: &str = "index.bin";
pub const TEXT_TABLE_FILE_NAME: &str = "texts.csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Ollama,
    FastEmbed,
    Hash,
}

impl EmbeddingProvider {
    pub const ALL: [Self; 3] = [Self::Ollama, Self::FastEmbed, Self::Hash];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::FastEmbed => "fastembed",
            Self::Hash => "hash",
        }
    }

    /// Model suggested when switching to this provider
    #[inline]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Ollama => "nomic-embed-text:latest",
            Self::FastEmbed => "BAAI/bge-small-en-v1.5",
            Self::Hash => "trigram",
        }
    }

    /// Vector size of [`EmbeddingProvider::default_model`]
    #[inline]
    pub fn default_dimension(self) -> u32 {
        match self {
            Self::Ollama => 768,
            Self::FastEmbed => 384,
            Self::Hash => 256,
        }
    }

    /// Squared-distance cutoff calibrated for [`EmbeddingProvider::default_model`]
    #[inline]
    pub fn default_distance_threshold(self) -> f32 {
        match self {
            Self::Ollama | Self::FastEmbed => 0.7,
            // Hashed features overlap sparsely, related text sits around 1.4
            Self::Hash => 1.6,
        }
    }
}

impl fmt::Display for EmbeddingProvider {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Ollama,
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
            embedding_dimension: 768,
        }
    }
}

/// Locations of the source documents ingested into the index.
///
/// A relative `data_dir` is resolved against the base directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    pub data_dir: PathBuf,
    pub tabular_file: String,
    pub paged_file: String,
    pub plain_file: String,
    /// Joins the fields of a tabular record into one text unit
    pub row_separator: String,
    /// Label attached to every retrieved unit
    pub source_tag: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tabular_file: "etl_cleaned_dataset.csv".to_string(),
            paged_file: "First Aid Quick Guide.pdf".to_string(),
            plain_file: "First_Aid_FAQ_and_Decision_Tips.txt".to_string(),
            row_separator: " | ".to_string(),
            source_tag: "First Aid Database".to_string(),
        }
    }
}

impl CorpusConfig {
    #[inline]
    pub fn tabular_path(&self) -> PathBuf {
        self.data_dir.join(&self.tabular_file)
    }

    #[inline]
    pub fn paged_path(&self) -> PathBuf {
        self.data_dir.join(&self.paged_file)
    }

    #[inline]
    pub fn plain_path(&self) -> PathBuf {
        self.data_dir.join(&self.plain_file)
    }
}

/// Retrieval and abstention policy.
///
/// `distance_threshold` is a squared L2 distance and only means something for
/// the model it was calibrated against, see
/// [`EmbeddingProvider::default_distance_threshold`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub distance_threshold: f32,
    pub snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            distance_threshold: 0.7,
            snippet_chars: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid distance threshold: {0} (must be a finite number greater than 0)")]
    InvalidDistanceThreshold(f32),
    #[error("Invalid snippet length: {0} (must be between 1 and 10000 characters)")]
    InvalidSnippetLength(usize),
    #[error("Invalid source tag (cannot be empty)")]
    InvalidSourceTag,
    #[error("Invalid corpus file name for {0} (cannot be empty)")]
    InvalidCorpusFile(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Defaults rooted at `base_dir`
    #[inline]
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// `~/.firstaid-rag`, or the platform data directory when there is no home
    #[inline]
    pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".firstaid-rag"))
            .or_else(|| dirs::data_dir().map(|data| data.join("firstaid-rag")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::with_base_dir(config_dir));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.corpus.validate()?;
        self.retrieval.validate()?;
        self.server.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Serialized flat vector index
    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.get_base_dir().join(INDEX_FILE_NAME)
    }

    /// Text table whose rows line up with the index vectors
    #[inline]
    pub fn text_table_path(&self) -> PathBuf {
        self.get_base_dir().join(TEXT_TABLE_FILE_NAME)
    }

    /// Directory the corpus is read from
    #[inline]
    pub fn corpus_dir(&self) -> PathBuf {
        if self.corpus.data_dir.is_absolute() {
            self.corpus.data_dir.clone()
        } else {
            self.get_base_dir().join(&self.corpus.data_dir)
        }
    }

    /// Corpus settings with `data_dir` replaced by [`Config::corpus_dir`]
    #[inline]
    pub fn resolved_corpus(&self) -> CorpusConfig {
        CorpusConfig {
            data_dir: self.corpus_dir(),
            ..self.corpus.clone()
        }
    }

    /// Select `provider`, resetting model, dimension and threshold to its
    /// defaults when it differs from the current one
    #[inline]
    pub fn switch_provider(&mut self, provider: EmbeddingProvider) -> Result<(), ConfigError> {
        if provider != self.embedding.provider {
            self.embedding
                .set_model(provider.default_model().to_string())?;
            self.embedding
                .set_embedding_dimension(provider.default_dimension())?;
            self.retrieval
                .set_distance_threshold(provider.default_distance_threshold())?;
        }
        self.embedding.set_provider(provider);
        Ok(())
    }

    /// Download cache for in-process embedding models
    #[inline]
    pub fn model_cache_dir(&self) -> PathBuf {
        self.get_base_dir().join("models")
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        // Connection settings only matter for the HTTP provider
        if self.provider == EmbeddingProvider::Ollama {
            if self.protocol != "http" && self.protocol != "https" {
                return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
            }

            if self.port == 0 {
                return Err(ConfigError::InvalidPort(self.port));
            }

            self.ollama_url()?;
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_provider(&mut self, provider: EmbeddingProvider) {
        self.provider = provider;
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl CorpusConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_tag.trim().is_empty() {
            return Err(ConfigError::InvalidSourceTag);
        }

        for (label, name) in [
            ("tabular_file", &self.tabular_file),
            ("paged_file", &self.paged_file),
            ("plain_file", &self.plain_file),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidCorpusFile(label));
            }
        }

        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !self.distance_threshold.is_finite() || self.distance_threshold <= 0.0 {
            return Err(ConfigError::InvalidDistanceThreshold(
                self.distance_threshold,
            ));
        }

        if !(1..=10_000).contains(&self.snippet_chars) {
            return Err(ConfigError::InvalidSnippetLength(self.snippet_chars));
        }

        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=50).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }

    pub fn set_distance_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidDistanceThreshold(threshold));
        }
        self.distance_threshold = threshold;
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        Ok(())
    }

    #[inline]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
