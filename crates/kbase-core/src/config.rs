//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_ENGINE__URL` sets `engine.url`). `Settings` is the typed view used to
//! wire the knowledge base at startup.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::types::Refresh;
use crate::DEFAULT_INDEX;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Merge `config.toml`, `config.<env>.toml` and `APP_*` variables found
    /// relative to `base_dir`.
    pub fn load_from(base_dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment, base_dir: &Path) -> anyhow::Result<Self> {
        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the whole configuration with paths resolved against the
    /// config base directory.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.engine.index_dir = resolve_with_base(&self.base_dir, settings.engine.index_dir.to_string_lossy());
        settings.counter.path = resolve_with_base(&self.base_dir, settings.counter.path.to_string_lossy());
        settings.schema.index_mapping = resolve_with_base(&self.base_dir, settings.schema.index_mapping.to_string_lossy());
        settings.schema.type_mapping = resolve_with_base(&self.base_dir, settings.schema.type_mapping.to_string_lossy());
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if settings.knowledge_base.index.trim().is_empty() {
            anyhow::bail!(crate::error::Error::InvalidConfig("knowledge_base.index must not be empty".into()));
        }
        if settings.knowledge_base.max_hits == 0 {
            anyhow::bail!(crate::error::Error::InvalidConfig("knowledge_base.max_hits must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub counter: CounterSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub index: String,
    pub max_hits: usize,
    pub refresh: Refresh,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self { index: DEFAULT_INDEX.to_string(), max_hits: 10, refresh: Refresh::True }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    #[default]
    Tantivy,
    Elastic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub backend: EngineBackend,
    /// Root directory of the embedded tantivy indexes.
    pub index_dir: PathBuf,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend: EngineBackend::Tantivy,
            index_dir: PathBuf::from("data/indexes"),
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_secs: Some(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    /// JSON file at `counter.path`; survives process restarts.
    #[default]
    File,
    /// Process-local; counts are lost on exit.
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CounterSettings {
    pub backend: CounterBackend,
    pub path: PathBuf,
    pub url: String,
    pub key_prefix: String,
}

impl Default for CounterSettings {
    fn default() -> Self {
        Self {
            backend: CounterBackend::File,
            path: PathBuf::from("data/counters.json"),
            url: "redis://localhost:6379/".to_string(),
            key_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    pub index_mapping: PathBuf,
    pub type_mapping: PathBuf,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            index_mapping: PathBuf::from("mappings/index_mapping.json"),
            type_mapping: PathBuf::from("mappings/type_mapping.json"),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
