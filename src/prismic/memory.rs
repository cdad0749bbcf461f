//! In-memory content repository
//!
//! Answers queries from a fixed list of documents, either built in code or
//! loaded from a JSON dump of API documents. Cursors look like
//! `memory://search/<query>?page=<n>`.

use async_trait::async_trait;
use std::cmp::Ordering as CmpOrdering;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;

use super::document::{ApiResponse, RawDocument};
use super::error::{ContentError, Result};
use super::query::{Ordering, Predicate, QueryOptions};
use super::ContentClient;

const CURSOR_PREFIX: &str = "memory://search/";
const DEFAULT_PAGE_SIZE: usize = 20;

/// Content client serving documents from memory
#[derive(Debug, Default)]
pub struct MemoryClient {
    documents: Vec<RawDocument>,
    /// Queries that issued cursors, addressed by index
    issued: Mutex<Vec<(Vec<Predicate>, QueryOptions)>>,
    offline: AtomicBool,
}

impl MemoryClient {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    /// Load a JSON array of documents, or a saved search response
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        let documents: Vec<RawDocument> = match value {
            serde_json::Value::Object(mut map) if map.contains_key("results") => {
                serde_json::from_value(map.remove("results").unwrap_or_default())?
            }
            other => serde_json::from_value(other)?,
        };
        tracing::info!(
            "Loaded {} documents from {:?}",
            documents.len(),
            path.as_ref()
        );
        Ok(Self::new(documents))
    }

    /// Make every subsequent request fail, as an unreachable API would
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(ContentError::ServerError {
                status: 503,
                message: "content repository offline".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Index of a query that hands out cursors
    ///
    /// Identical queries share an index, and queries that fit on one page
    /// are never recorded.
    fn register(&self, predicates: &[Predicate], options: &QueryOptions) -> usize {
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(index) = issued
            .iter()
            .position(|(p, o)| p.as_slice() == predicates && o == options)
        {
            return index;
        }
        issued.push((predicates.to_vec(), options.clone()));
        issued.len() - 1
    }

    fn issued_query(&self, index: usize) -> Result<(Vec<Predicate>, QueryOptions)> {
        let issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        issued
            .get(index)
            .cloned()
            .ok_or_else(|| ContentError::ForeignCursor(format!("query {}", index)))
    }

    #[cfg(test)]
    fn issued_len(&self) -> usize {
        self.issued.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn search(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
        page: usize,
        query_index: Option<usize>,
    ) -> Result<ApiResponse> {
        let mut matches: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|doc| predicates.iter().all(|p| matches_predicate(doc, p)))
            .collect();

        if !options.orderings.is_empty() {
            matches.sort_by(|a, b| compare(a, b, &options.orderings));
        }

        if let Some(after) = &options.after {
            matches = match matches.iter().position(|doc| &doc.id == after) {
                Some(pos) => matches.split_off(pos + 1),
                None => Vec::new(),
            };
        }

        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let total = matches.len();
        let total_pages = total.div_ceil(page_size);
        let start = (page - 1) * page_size;
        let results: Vec<RawDocument> = matches
            .into_iter()
            .skip(start)
            .take(page_size)
            .map(|doc| project(doc, &options.fetch))
            .collect();

        let has_next = page < total_pages;
        let has_prev = page > 1;
        let query_index = match query_index {
            Some(index) => index,
            None if has_next || has_prev => self.register(predicates, options),
            None => 0,
        };
        let cursor = |page: usize| format!("{}{}?page={}", CURSOR_PREFIX, query_index, page);
        Ok(ApiResponse {
            page,
            results_per_page: page_size,
            total_results_size: total,
            total_pages,
            next_page: has_next.then(|| cursor(page + 1)),
            prev_page: has_prev.then(|| cursor(page - 1)),
            results,
        })
    }
}

#[async_trait]
impl ContentClient for MemoryClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<ApiResponse> {
        self.check_online()?;
        self.search(predicates, options, options.page.unwrap_or(1).max(1), None)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse> {
        self.check_online()?;
        let (index, page) =
            parse_cursor(cursor).ok_or_else(|| ContentError::ForeignCursor(cursor.to_string()))?;
        let (predicates, options) = self.issued_query(index)?;
        self.search(&predicates, &options, page, Some(index))
    }

    fn accepts_cursor(&self, cursor: &str) -> bool {
        parse_cursor(cursor).is_some()
    }
}

fn parse_cursor(cursor: &str) -> Option<(usize, usize)> {
    let rest = cursor.strip_prefix(CURSOR_PREFIX)?;
    let (index, page) = rest.split_once("?page=")?;
    let page: usize = page.parse().ok()?;
    if page == 0 {
        return None;
    }
    Some((index.parse().ok()?, page))
}

fn matches_predicate(doc: &RawDocument, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::At { path, value } => match path.as_str() {
            "document.type" => &doc.doc_type == value,
            "document.id" => &doc.id == value,
            _ => match path.strip_prefix("my.") {
                Some(rest) => {
                    let Some((doc_type, field)) = rest.split_once('.') else {
                        return false;
                    };
                    if doc.doc_type != doc_type {
                        return false;
                    }
                    if field == "uid" {
                        return doc.uid.as_deref() == Some(value.as_str());
                    }
                    doc.data.get(field).and_then(|v| v.as_str()) == Some(value.as_str())
                }
                None => false,
            },
        },
    }
}

fn compare(a: &RawDocument, b: &RawDocument, orderings: &[Ordering]) -> CmpOrdering {
    for ordering in orderings {
        let ord = match ordering.field.as_str() {
            super::FIRST_PUBLICATION_DATE => a.first_publication_date.cmp(&b.first_publication_date),
            super::LAST_PUBLICATION_DATE => a.last_publication_date.cmp(&b.last_publication_date),
            field => {
                let key = field.rsplit('.').next().unwrap_or(field);
                let left = a.data.get(key).map(|v| v.to_string());
                let right = b.data.get(key).map(|v| v.to_string());
                left.cmp(&right)
            }
        };
        let ord = if ordering.descending { ord.reverse() } else { ord };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    CmpOrdering::Equal
}

/// Keep only the `fetch` fields of `data`
fn project(doc: &RawDocument, fetch: &[String]) -> RawDocument {
    let mut doc = doc.clone();
    if fetch.is_empty() {
        return doc;
    }
    if let serde_json::Value::Object(map) = &mut doc.data {
        let prefix = format!("{}.", doc.doc_type);
        map.retain(|key, _| {
            fetch
                .iter()
                .any(|f| f.strip_prefix(&prefix) == Some(key.as_str()))
        });
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prismic::{FIRST_PUBLICATION_DATE, LAST_PUBLICATION_DATE};

    fn doc(id: &str, uid: &str, published: &str) -> RawDocument {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "uid": uid,
            "type": "posts",
            "first_publication_date": published,
            "last_publication_date": published,
            "data": { "title": format!("Post {}", uid), "subtitle": "sub", "author": "Ana" }
        }))
        .unwrap()
    }

    fn client() -> MemoryClient {
        MemoryClient::new(vec![
            doc("b", "second", "2021-02-01T10:00:00+0000"),
            doc("a", "first", "2021-01-01T10:00:00+0000"),
            doc("c", "third", "2021-03-01T10:00:00+0000"),
        ])
    }

    #[tokio::test]
    async fn test_pagination_follows_cursor() {
        let client = client();
        let options = QueryOptions::new().page_size(2);
        let first = client
            .query(&[Predicate::document_type("posts")], &options)
            .await
            .unwrap();
        assert_eq!(first.results.len(), 2);
        assert_eq!(first.total_pages, 2);
        let cursor = first.next_page.unwrap();
        assert!(client.accepts_cursor(&cursor));

        let second = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].id, "c");
        assert!(second.next_page.is_none());
    }

    #[tokio::test]
    async fn test_only_paged_queries_are_recorded() {
        let client = client();
        for i in 0..50 {
            let missing = client
                .get_by_uid("posts", &format!("nope-{}", i), &QueryOptions::new())
                .await
                .unwrap();
            assert!(missing.is_none());
        }
        assert_eq!(client.issued_len(), 0);

        let options = QueryOptions::new().page_size(1);
        let first = client
            .query(&[Predicate::document_type("posts")], &options)
            .await
            .unwrap();
        let again = client
            .query(&[Predicate::document_type("posts")], &options)
            .await
            .unwrap();
        assert_eq!(first.next_page, again.next_page);
        assert_eq!(client.issued_len(), 1);
    }

    #[tokio::test]
    async fn test_after_with_ordering() {
        let client = client();
        let asc = QueryOptions::new()
            .page_size(1)
            .after("a")
            .order_by(Ordering::asc(FIRST_PUBLICATION_DATE));
        let response = client
            .query(&[Predicate::document_type("posts")], &asc)
            .await
            .unwrap();
        assert_eq!(response.results[0].id, "b");

        let desc = QueryOptions::new()
            .page_size(1)
            .after("a")
            .order_by(Ordering::desc(LAST_PUBLICATION_DATE));
        let response = client
            .query(&[Predicate::document_type("posts")], &desc)
            .await
            .unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let client = client();
        let found = client
            .get_by_uid("posts", "second", &QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "b");

        let missing = client
            .get_by_uid("posts", "nope", &QueryOptions::new())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_fetch_projects_fields() {
        let client = client();
        let options = QueryOptions::new().fetch(["posts.title"]);
        let response = client
            .query(&[Predicate::document_type("posts")], &options)
            .await
            .unwrap();
        let data = response.results[0].data.as_object().unwrap();
        assert!(data.contains_key("title"));
        assert!(!data.contains_key("author"));
    }

    #[tokio::test]
    async fn test_offline_and_foreign_cursor() {
        let client = client();
        assert!(matches!(
            client.fetch_page("https://example.com/x").await,
            Err(ContentError::ForeignCursor(_))
        ));
        client.set_offline(true);
        assert!(matches!(
            client.query(&[], &QueryOptions::new()).await,
            Err(ContentError::ServerError { status: 503, .. })
        ));
    }

    #[test]
    fn test_from_json_file_accepts_search_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        std::fs::write(
            &path,
            r#"{ "next_page": null, "results": [
                { "id": "a", "uid": "first", "type": "posts", "data": {} }
            ] }"#,
        )
        .unwrap();
        let client = MemoryClient::from_json_file(&path).unwrap();
        assert_eq!(client.documents.len(), 1);
    }
}
