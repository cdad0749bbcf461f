//! Content client for the Prismic content repository
//!
//! Pages never hold a global client: a `ContentClient` handle is built once
//! and passed to every data-fetching entry point.

mod client;
mod document;
mod error;
mod memory;
mod query;

pub use client::PrismicClient;
pub use document::{timestamp, ApiResponse, Document, RawDocument};
pub use error::{ContentError, Result};
pub use memory::MemoryClient;
pub use query::{
    encode_orderings, encode_predicates, Ordering, Predicate, QueryOptions,
    FIRST_PUBLICATION_DATE, LAST_PUBLICATION_DATE,
};

use async_trait::async_trait;

/// Query interface of the content repository
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Search documents matching all predicates
    async fn query(&self, predicates: &[Predicate], options: &QueryOptions)
        -> Result<ApiResponse>;

    /// Follow a `next_page` cursor returned by an earlier query
    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse>;

    /// Whether a cursor was issued by this repository
    fn accepts_cursor(&self, cursor: &str) -> bool;

    /// Fetch a single document by its custom type and uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        options: &QueryOptions,
    ) -> Result<Option<RawDocument>> {
        let predicates = [
            Predicate::document_type(doc_type),
            Predicate::at(format!("my.{}.uid", doc_type), uid),
        ];
        let options = QueryOptions {
            page_size: Some(1),
            ..options.clone()
        };
        let response = self.query(&predicates, &options).await?;
        Ok(response.results.into_iter().next())
    }

    /// Fetch a single document by its internal id
    async fn get_by_id(&self, id: &str, options: &QueryOptions) -> Result<Option<RawDocument>> {
        let options = QueryOptions {
            page_size: Some(1),
            ..options.clone()
        };
        let response = self
            .query(&[Predicate::at("document.id", id)], &options)
            .await?;
        Ok(response.results.into_iter().next())
    }
}
