//! Post list page

use crate::config::PrismicConfig;
use crate::content::{summary_fields, PostListState, PostSummary};
use crate::prismic::{ContentClient, ContentError, Predicate, QueryOptions, Result};

/// Data of the list page
#[derive(Debug, Clone)]
pub struct HomePage {
    pub posts: PostListState,
    pub preview: bool,
}

/// One page fetched through "load more"
#[derive(Debug, Clone)]
pub struct MorePosts {
    pub posts: Vec<PostSummary>,
    pub next_page: Option<String>,
}

/// Query options for the first page of the list
pub fn list_options(config: &PrismicConfig, reference: Option<String>) -> QueryOptions {
    QueryOptions::new()
        .fetch(summary_fields(&config.document_type))
        .page_size(config.page_size)
        .reference(reference)
}

/// Fetch the first page of posts
pub async fn fetch_home(
    client: &dyn ContentClient,
    config: &PrismicConfig,
    reference: Option<String>,
) -> Result<HomePage> {
    let preview = reference.is_some();
    let response = client
        .query(
            &[Predicate::document_type(&config.document_type)],
            &list_options(config, reference),
        )
        .await?;
    let posts = PostListState::from_response(&response)?;
    tracing::debug!(
        "Fetched {} of {} posts",
        posts.items().len(),
        response.total_results_size
    );
    Ok(HomePage { posts, preview })
}

/// Follow a cursor handed out with an earlier page
///
/// Only cursors issued by the configured repository are followed.
pub async fn fetch_more(client: &dyn ContentClient, cursor: &str) -> Result<MorePosts> {
    if !client.accepts_cursor(cursor) {
        return Err(ContentError::ForeignCursor(cursor.to_string()));
    }
    let mut state = PostListState::new(Vec::new(), Some(cursor.to_string()));
    state.load_more(client).await?;
    let next_page = state.cursor().map(str::to_string);
    Ok(MorePosts {
        posts: state.into_items(),
        next_page,
    })
}

/// Every post of the repository, following all cursors
pub async fn fetch_all_summaries(
    client: &dyn ContentClient,
    config: &PrismicConfig,
) -> Result<Vec<PostSummary>> {
    let mut home = fetch_home(client, config, None).await?;
    home.posts.load_all(client).await?;
    Ok(home.posts.into_items())
}
