//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,
    pub url: String,
    pub logo: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,
    pub i18n_dir: String,

    // Content
    #[serde(default)]
    pub prismic: PrismicConfig,

    /// Seconds before a rendered post page is regenerated
    pub revalidate_secs: u64,

    // Comments
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            url: "http://localhost:3000".to_string(),
            logo: "/spacetraveling.png".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            i18n_dir: "languages".to_string(),

            prismic: PrismicConfig::default(),

            revalidate_secs: 60 * 60 * 12,

            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` overrides
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("PRISMIC_API_ENDPOINT") {
            if !endpoint.is_empty() {
                tracing::debug!("Using content endpoint from environment");
                self.prismic.endpoint = endpoint;
            }
        }
        if let Ok(token) = std::env::var("PRISMIC_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.prismic.access_token = Some(token);
            }
        }
    }

    /// Revalidation window for post pages
    pub fn revalidate(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.revalidate_secs)
    }
}

/// Content repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Posts per page on the list page
    pub page_size: usize,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
        }
    }
}

/// utterances comment thread configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enable: bool,
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            repo: String::new(),
            issue_term: "pathname".to_string(),
            label: "comment :speech_balloon:".to_string(),
            theme: "photon-dark".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.prismic.document_type, "posts");
        assert_eq!(config.prismic.page_size, 1);
        assert_eq!(config.revalidate().as_secs(), 43_200);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: en
prismic:
  endpoint: https://example.cdn.prismic.io/api/v2
  page_size: 5
comments:
  repo: someone/blog-comments
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.language, "en");
        assert_eq!(config.prismic.page_size, 5);
        assert_eq!(config.prismic.document_type, "posts");
        assert_eq!(config.comments.repo, "someone/blog-comments");
        assert_eq!(config.comments.theme, "photon-dark");
        assert_eq!(config.revalidate_secs, 43_200);
    }
}
