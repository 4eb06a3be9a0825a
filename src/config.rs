use crate::{CrawlerError, FieldSpec, UrlEntry};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(version, about = "Scrape configured pages with a headless browser")]
pub struct Args {
    /// Path to config file
    #[arg(short, long)]
    pub config: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub urls: Vec<UrlEntry>,
    pub content: Vec<FieldSpec>,
    pub output: OutputConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, CrawlerError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Where records go. `action` is kept as written so an unknown value is
/// reported when saving starts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    pub action: String,
    pub url: Option<String>,
    pub path: Option<PathBuf>,
    /// Write every record into one csv file instead of one overwrite per record.
    #[serde(default)]
    pub aggregate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            headless: true,
            viewport: Viewport::default(),
            executable: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1920,
            height: 926,
        }
    }
}
