//! Paginated post list

use serde::Serialize;

use super::PostSummary;
use crate::prismic::{ApiResponse, ContentClient, ContentError, Result};

/// Map a search response to list entries
pub fn summaries(response: &ApiResponse) -> Result<Vec<PostSummary>> {
    response
        .results
        .iter()
        .map(PostSummary::from_document)
        .collect()
}

/// Posts shown so far and the cursor to the next page
///
/// `items` only ever grows: each `load_more` appends the next page as is,
/// without reordering or removing duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostListState {
    items: Vec<PostSummary>,
    cursor: Option<String>,
}

impl PostListState {
    pub fn new(items: Vec<PostSummary>, cursor: Option<String>) -> Self {
        Self { items, cursor }
    }

    /// State after the first page
    pub fn from_response(response: &ApiResponse) -> Result<Self> {
        Ok(Self::new(summaries(response)?, response.next_page.clone()))
    }

    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether "load more" is available
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn into_items(self) -> Vec<PostSummary> {
        self.items
    }

    /// Fetch the page behind the cursor and append it
    ///
    /// On error nothing changes. Returns the number of appended posts.
    pub async fn load_more(&mut self, client: &dyn ContentClient) -> Result<usize> {
        let cursor = self.cursor.as_deref().ok_or(ContentError::NoMorePages)?;
        let response = client.fetch_page(cursor).await?;
        let new_items = summaries(&response)?;

        let added = new_items.len();
        self.items.extend(new_items);
        self.cursor = response.next_page;
        tracing::debug!(
            "Loaded {} more posts, {} total, more: {}",
            added,
            self.items.len(),
            self.cursor.is_some()
        );
        Ok(added)
    }

    /// Keep loading until the repository reports no further pages
    pub async fn load_all(&mut self, client: &dyn ContentClient) -> Result<()> {
        while self.has_more() {
            self.load_more(client).await?;
        }
        Ok(())
    }
}
