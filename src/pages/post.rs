//! Post detail page

use crate::config::PrismicConfig;
use crate::content::{reading_time, NavPost, Navigation, PostDetail};
use crate::prismic::{
    ContentClient, Ordering, Predicate, QueryOptions, Result, FIRST_PUBLICATION_DATE,
};

use super::HOME_PATH;

/// Data of a post page
#[derive(Debug, Clone)]
pub struct PostPage {
    pub detail: PostDetail,
    pub navigation: Navigation,
    /// Minutes, computed once over the full content
    pub reading_time: u32,
    pub preview: bool,
}

/// What a post route resolves to
#[derive(Debug, Clone)]
pub enum PostOutcome {
    Render(Box<PostPage>),
    Redirect(String),
}

/// Which neighbor to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Neighbor {
    /// Published just before the post
    Previous,
    /// Published just after the post
    Next,
}

/// Query options for one chronological neighbor of the document `id`
///
/// Walking the publication dates downwards from the post finds the previous
/// one, walking upwards finds the next one.
pub fn neighbor_options(
    config: &PrismicConfig,
    id: &str,
    previous: bool,
    reference: Option<String>,
) -> QueryOptions {
    let ordering = if previous {
        Ordering::desc(FIRST_PUBLICATION_DATE)
    } else {
        Ordering::asc(FIRST_PUBLICATION_DATE)
    };
    QueryOptions::new()
        .fetch([format!("{}.title", config.document_type)])
        .page_size(1)
        .after(id)
        .order_by(ordering)
        .reference(reference)
}

async fn fetch_neighbor(
    client: &dyn ContentClient,
    config: &PrismicConfig,
    id: &str,
    neighbor: Neighbor,
    reference: Option<String>,
) -> Result<Option<NavPost>> {
    let options = neighbor_options(config, id, neighbor == Neighbor::Previous, reference);
    let response = client
        .query(&[Predicate::document_type(&config.document_type)], &options)
        .await?;
    Ok(response.results.first().map(NavPost::from_document))
}

/// Fetch a post and its neighbors
///
/// An unknown uid resolves to a redirect home without any neighbor query.
pub async fn fetch_post(
    client: &dyn ContentClient,
    config: &PrismicConfig,
    uid: &str,
    reference: Option<String>,
) -> Result<PostOutcome> {
    let options = QueryOptions::new().reference(reference.clone());
    let Some(document) = client
        .get_by_uid(&config.document_type, uid, &options)
        .await?
    else {
        tracing::info!("No post with uid {:?}, redirecting home", uid);
        return Ok(PostOutcome::Redirect(HOME_PATH.to_string()));
    };

    let detail = PostDetail::from_document(&document)?;
    let (previous, next) = tokio::try_join!(
        fetch_neighbor(client, config, &detail.id, Neighbor::Previous, reference.clone()),
        fetch_neighbor(client, config, &detail.id, Neighbor::Next, reference.clone()),
    )?;

    let minutes = reading_time::estimate(&detail.content);
    Ok(PostOutcome::Render(Box::new(PostPage {
        detail,
        navigation: Navigation { previous, next },
        reading_time: minutes,
        preview: reference.is_some(),
    })))
}
