//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary. HTML autoescaping stays on; only
//! sanitized rich text and widget markup are passed through with `safe`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{NavPost, PostDetail, PostSummary};
use crate::helpers::{date_xml, post_path, DateFormatter};
use crate::i18n::I18n;
use crate::richtext;

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer with all templates loaded and `t()` bound to `i18n`
    pub fn new(i18n: &I18n) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("loading.html", include_str!("site/loading.html")),
            ("summaries.html", include_str!("site/summaries.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_summary.html",
                include_str!("site/partials/post_summary.html"),
            ),
        ])?;

        tera.register_function("t", translate_function(i18n.clone()));

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera function: `t(key="load_more")`, or `t(key="reading_time", count=3)`
fn translate_function(
    i18n: I18n,
) -> impl Fn(&HashMap<String, tera::Value>) -> tera::Result<tera::Value> + Send + Sync {
    move |args: &HashMap<String, tera::Value>| {
        let key = match args.get("key") {
            Some(val) => tera::try_get_value!("t", "key", String, val),
            None => return Err(tera::Error::msg("Function `t` requires a `key` argument")),
        };
        let text = match args.get("count") {
            Some(val) => {
                let count = tera::try_get_value!("t", "count", u64, val);
                i18n.get_plural(&key, count)
            }
            None => i18n.get(&key),
        };
        Ok(tera::Value::String(text))
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub logo: String,
    pub language: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            logo: config.logo.clone(),
            language: config.language.clone(),
        }
    }
}

/// A post list entry
#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Formatted publication date, or the "unpublished" text
    pub date: String,
    /// Machine-readable publication date
    pub datetime: Option<String>,
}

impl SummaryData {
    pub fn new(post: &PostSummary, dates: &DateFormatter, i18n: &I18n) -> Self {
        let pattern = i18n.get("date.published");
        Self {
            path: post_path(&post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: dates
                .format_opt(post.first_publication_date.as_ref(), &pattern)
                .unwrap_or_else(|| i18n.get("unpublished")),
            datetime: post.first_publication_date.as_ref().map(date_xml),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockData {
    pub heading: String,
    /// Sanitized HTML of the body
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub banner_url: String,
    pub banner_alt: String,
    pub author: String,
    pub date: String,
    pub datetime: Option<String>,
    /// Last update, absent when the post was never edited
    pub updated: Option<String>,
    pub reading_time: String,
    pub content: Vec<BlockData>,
}

impl PostData {
    pub fn new(post: &PostDetail, reading_time: u32, dates: &DateFormatter, i18n: &I18n) -> Self {
        let published = i18n.get("date.published");
        let updated = i18n.get("date.updated");
        let banner_url = if crate::helpers::is_safe_url(&post.banner.url) {
            post.banner.url.clone()
        } else {
            String::new()
        };
        Self {
            title: post.title.clone(),
            banner_url,
            banner_alt: post.banner.alt.clone().unwrap_or_else(|| post.title.clone()),
            author: post.author.clone(),
            date: dates
                .format_opt(post.first_publication_date.as_ref(), &published)
                .unwrap_or_else(|| i18n.get("unpublished")),
            datetime: post.first_publication_date.as_ref().map(date_xml),
            updated: dates.format_opt(post.last_publication_date.as_ref(), &updated),
            reading_time: i18n.get_plural("reading_time", u64::from(reading_time)),
            content: post
                .content
                .iter()
                .map(|block| BlockData {
                    heading: block.heading.clone(),
                    html: richtext::as_html(&block.body),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NavData {
    pub title: String,
    pub path: String,
}

impl From<&NavPost> for NavData {
    fn from(post: &NavPost) -> Self {
        Self {
            title: post.title.clone(),
            path: post_path(&post.uid),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NavigationData {
    pub previous: Option<NavData>,
    pub next: Option<NavData>,
}
