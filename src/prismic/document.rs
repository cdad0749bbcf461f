//! Documents and search responses as returned by the content API

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::Result;

/// A content document. `data` stays untyped until a page decodes it.
#[derive(Debug, Clone, Deserialize)]
pub struct Document<T = serde_json::Value> {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub last_publication_date: Option<DateTime<FixedOffset>>,
    pub data: T,
}

/// A document whose data has not been decoded yet
pub type RawDocument = Document<serde_json::Value>;

impl RawDocument {
    /// Decode `data` into a typed structure
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Document<T>> {
        Ok(Document {
            id: self.id.clone(),
            uid: self.uid.clone(),
            doc_type: self.doc_type.clone(),
            first_publication_date: self.first_publication_date,
            last_publication_date: self.last_publication_date,
            data: serde_json::from_value(self.data.clone())?,
        })
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiResponse {
    pub page: usize,
    pub results_per_page: usize,
    pub total_results_size: usize,
    pub total_pages: usize,
    /// Cursor for the following page; `None` on the last page
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<RawDocument>,
}

/// Timestamps as the API writes them (`2021-03-25T19:25:28+0000`)
pub mod timestamp {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer};

    const API_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    /// Parse the API format, falling back to RFC 3339
    pub fn parse(value: &str) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(value, API_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(value))
            .ok()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }
}
