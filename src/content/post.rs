//! Post models decoded from content documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::prismic::{RawDocument, Result};
use crate::richtext::Block;

/// Fields requested for list entries of a custom type
pub fn summary_fields(doc_type: &str) -> Vec<String> {
    ["title", "subtitle", "author"]
        .iter()
        .map(|field| format!("{}.{}", doc_type, field))
        .collect()
}

/// Minimal fields needed for a list entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryData {
    title: String,
    subtitle: String,
    author: String,
}

impl PostSummary {
    /// Keep only the summary fields of a document
    pub fn from_document(doc: &RawDocument) -> Result<Self> {
        let typed = doc.decode::<SummaryData>()?;
        Ok(Self {
            uid: doc.uid.clone().unwrap_or_else(|| doc.id.clone()),
            first_publication_date: doc.first_publication_date,
            title: typed.data.title,
            subtitle: typed.data.subtitle,
            author: typed.data.author,
        })
    }
}

/// A heading followed by rich-text body blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    title: String,
    #[serde(default)]
    banner: Banner,
    author: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Full fields needed for an article page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    /// Internal document id, used as the neighbor query anchor
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub banner: Banner,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

impl PostDetail {
    pub fn from_document(doc: &RawDocument) -> Result<Self> {
        let typed = doc.decode::<DetailData>()?;
        Ok(Self {
            id: doc.id.clone(),
            uid: doc.uid.clone().unwrap_or_else(|| doc.id.clone()),
            first_publication_date: doc.first_publication_date,
            last_publication_date: doc.last_publication_date,
            title: typed.data.title,
            banner: typed.data.banner,
            author: typed.data.author,
            content: typed.data.content,
        })
    }
}

/// Link to a neighboring post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavPost {
    pub uid: String,
    pub title: String,
}

impl NavPost {
    pub fn from_document(doc: &RawDocument) -> Self {
        let title = doc
            .data
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            uid: doc.uid.clone().unwrap_or_else(|| doc.id.clone()),
            title,
        }
    }
}

/// Chronological neighbors of a post
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Navigation {
    pub previous: Option<NavPost>,
    pub next: Option<NavPost>,
}
