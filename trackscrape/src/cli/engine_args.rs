use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::backend::BrowserConfig;
use crate::engine::{ExpandOptions, ExtractOptions, Extractor, SelectorCatalog};

pub const DEFAULT_BASE_URL: &str = "https://open.spotify.com/artist/";

/// Extraction settings shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct EngineArgs {
    /// Selector catalog YAML file (defaults to the embedded catalog)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Artist page URL prefix; the artist ID is appended
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Page load timeout in seconds
    #[arg(long, default_value = "90")]
    pub load_timeout: u64,

    /// Timeout for a single page operation in seconds
    #[arg(long, default_value = "10")]
    pub op_timeout: u64,

    /// How long to wait for the track list to render, in seconds
    #[arg(long, default_value = "10")]
    pub locate_timeout: u64,

    /// Expand the track list until at least this many rows are visible
    #[arg(long, default_value = "10")]
    pub target_rows: usize,

    /// Maximum expansion rounds
    #[arg(long, default_value = "3")]
    pub max_attempts: usize,

    /// Wait after each expand activation, in milliseconds
    #[arg(long, default_value = "3000")]
    pub settle_ms: u64,

    /// Wait between expansion rounds, in milliseconds
    #[arg(long, default_value = "2000")]
    pub retry_pause_ms: u64,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Proxy server for the browser (e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    pub proxy: Option<String>,
}

impl Default for EngineArgs {
    fn default() -> Self {
        Self {
            catalog: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            load_timeout: 90,
            op_timeout: 10,
            locate_timeout: 10,
            target_rows: 10,
            max_attempts: 3,
            settle_ms: 3000,
            retry_pause_ms: 2000,
            headful: false,
            proxy: None,
        }
    }
}

impl EngineArgs {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            expand: ExpandOptions {
                target_rows: self.target_rows,
                max_attempts: self.max_attempts,
                settle: Duration::from_millis(self.settle_ms),
                retry_pause: Duration::from_millis(self.retry_pause_ms),
            },
            load_timeout: Duration::from_secs(self.load_timeout),
            locate_timeout: Duration::from_secs(self.locate_timeout),
            ..ExtractOptions::default()
        }
    }

    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            headless: !self.headful,
            proxy: self.proxy.clone(),
            op_timeout: Duration::from_secs(self.op_timeout),
        }
    }

    pub fn extractor(&self) -> Result<Extractor> {
        let catalog = SelectorCatalog::load_or_builtin(self.catalog.as_deref())
            .context("Failed to load selector catalog")?;
        Ok(Extractor::new(
            Arc::new(catalog),
            self.extract_options(),
            self.base_url.clone(),
        ))
    }
}
