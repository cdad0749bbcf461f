//! spacetraveling: blog front-end for a Prismic content repository
//!
//! Renders the post list and post pages with built-in Tera templates, either
//! to static files or on demand from an HTTP server that revalidates pages
//! in the background.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod pages;
pub mod prismic;
pub mod richtext;
pub mod server;
pub mod templates;
pub mod widgets;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use prismic::{ContentClient, MemoryClient, PrismicClient};

/// The site being rendered
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim
    pub static_dir: PathBuf,
    /// Language file overrides
    pub i18n_dir: PathBuf,
}

impl Site {
    /// Load a site from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let i18n_dir = base_dir.join(&config.i18n_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            i18n_dir,
        })
    }

    /// Build the content client
    ///
    /// A fixtures file is served from memory; otherwise the configured
    /// Prismic endpoint is queried.
    pub fn content_client(&self, fixtures: Option<&Path>) -> Result<Arc<dyn ContentClient>> {
        if let Some(path) = fixtures {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir.join(path)
            };
            let client = MemoryClient::from_json_file(&path)
                .with_context(|| format!("Failed to load fixtures {:?}", path))?;
            return Ok(Arc::new(client));
        }

        if self.config.prismic.endpoint.is_empty() {
            anyhow::bail!(
                "No content endpoint configured. Set prismic.endpoint in _config.yml, \
                 PRISMIC_API_ENDPOINT, or pass --fixtures"
            );
        }
        Ok(Arc::new(PrismicClient::from_config(&self.config.prismic)))
    }

    /// Generate the static site
    pub async fn generate(&self, client: &dyn ContentClient) -> Result<()> {
        commands::generate::run(self, client).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
