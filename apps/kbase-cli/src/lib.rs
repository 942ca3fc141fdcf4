//! Shared startup for the `kbase` binaries.
use std::path::{Path, PathBuf};

use anyhow::Context;
use kbase_core::config::{resolve_with_base, Config, Settings};
use kbase_core::types::Refresh;
use kbase_facade::DynKnowledgeBase;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to stderr (`RUST_LOG`, default `info`) so stdout stays for results.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

pub struct App {
    pub config: Config,
    pub settings: Settings,
}

impl App {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Errors are returned, not printed; `main` reports them once.
    pub fn load_from(base_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load_from(base_dir).context("failed to load config")?;
        let settings = config.settings()?;
        Ok(Self { config, settings })
    }

    pub fn connect(&self) -> anyhow::Result<DynKnowledgeBase> {
        kbase_facade::connect(&self.settings).context("failed to connect knowledge base")
    }

    /// `data.articles_dir` from the config, relative to the config directory.
    pub fn articles_dir(&self) -> PathBuf {
        let dir: String = self.config.get("data.articles_dir").unwrap_or_else(|_| "data/articles".to_string());
        resolve_with_base(self.config.base_dir(), dir)
    }
}

/// Value of `--flag <value>` in `args`, removing both from the list.
pub fn take_option(args: &mut Vec<String>, flag: &str) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == flag) else { return Ok(None) };
    if pos + 1 >= args.len() {
        anyhow::bail!("{} requires a value", flag);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

pub fn take_refresh(args: &mut Vec<String>, default: Refresh) -> anyhow::Result<Refresh> {
    match take_option(args, "--refresh")? {
        Some(raw) => raw.parse::<Refresh>().map_err(|e| anyhow::anyhow!("invalid --refresh value '{}': {}", raw, e)),
        None => Ok(default),
    }
}
