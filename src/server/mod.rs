//! HTTP server with on-demand generation and background revalidation

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{RenderCache, Rendered, Served};
use crate::generator::Generator;
use crate::helpers::{more_posts_url, post_path, MORE_POSTS_PATH};
use crate::pages::{self, HOME_PATH};
use crate::prismic::{ContentClient, ContentError, QueryOptions};

/// Cookie carrying the preview ref
pub const PREVIEW_COOKIE: &str = "io.prismic.preview";

/// Server state
pub struct AppState {
    pub generator: Generator,
    pub client: Arc<dyn ContentClient>,
    pub cache: RenderCache,
}

impl AppState {
    pub fn new(generator: Generator, client: Arc<dyn ContentClient>) -> Self {
        Self {
            generator,
            client,
            cache: RenderCache::new(),
        }
    }

    fn revalidate(&self) -> Duration {
        self.generator.site().config.revalidate()
    }
}

/// A page the server knows how to generate
#[derive(Debug, Clone)]
enum PageJob {
    Home,
    Post(String),
}

impl PageJob {
    fn route(&self) -> String {
        match self {
            PageJob::Home => HOME_PATH.to_string(),
            PageJob::Post(uid) => post_path(uid),
        }
    }

    /// Revalidation window; the list page has none
    fn window(&self, state: &AppState) -> Option<Duration> {
        match self {
            PageJob::Home => None,
            PageJob::Post(_) => Some(state.revalidate()),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.generator.site().static_dir.clone();
    Router::new()
        .route("/", get(home_handler))
        .route("/post/:slug", get(post_handler))
        .route(MORE_POSTS_PATH, get(more_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
///
/// With `prebuild`, every page is generated before the listener opens.
pub async fn start(state: AppState, ip: &str, port: u16, prebuild: bool) -> Result<()> {
    let state = Arc::new(state);

    if prebuild {
        tracing::info!("Prebuilding pages...");
        let generated = state.generator.generate(state.client.as_ref()).await?;
        for (route, output) in generated {
            if route != HOME_PATH {
                state.cache.insert_prebuilt(&route, output).await;
            }
        }
        // The served index loads more posts from the API, not from files
        let home = generate_page(&state, &PageJob::Home, None).await?;
        state.cache.insert_prebuilt(HOME_PATH, home).await;
        tracing::info!("Prebuilt {} pages", state.cache.len().await);
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home_handler(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    match preview_ref(&jar) {
        Some(reference) => render_preview(&state, PageJob::Home, reference).await,
        None => serve_page(state, PageJob::Home).await,
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Response {
    let job = PageJob::Post(slug);
    match preview_ref(&jar) {
        Some(reference) => render_preview(&state, job, reference).await,
        None => serve_page(state, job).await,
    }
}

fn preview_ref(jar: &CookieJar) -> Option<String> {
    jar.get(PREVIEW_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Serve a page through the render cache
async fn serve_page(state: Arc<AppState>, job: PageJob) -> Response {
    let route = job.route();
    let lookup = state.cache.lookup(&route, job.window(&state)).await;
    if lookup.generate {
        spawn_generation(state.clone(), job);
    }

    match lookup.served {
        Served::Output(output) => respond(&output),
        Served::Placeholder => placeholder(&state),
    }
}

/// Generate a page in the background and record the outcome
fn spawn_generation(state: Arc<AppState>, job: PageJob) {
    tokio::spawn(async move {
        let route = job.route();
        match generate_page(&state, &job, None).await {
            Ok(output) => state.cache.complete(&route, output).await,
            Err(e) => {
                tracing::error!("Failed to generate {}: {:#}", route, e);
                state.cache.fail(&route).await;
            }
        }
    });
}

async fn generate_page(
    state: &AppState,
    job: &PageJob,
    reference: Option<String>,
) -> Result<Rendered> {
    let prismic = &state.generator.site().config.prismic;
    let client = state.client.as_ref();
    match job {
        PageJob::Home => {
            let home = pages::fetch_home(client, prismic, reference).await?;
            let load_more = home.posts.cursor().map(more_posts_url);
            Ok(Rendered::Html(
                state.generator.render_home(&home, load_more.as_deref())?,
            ))
        }
        PageJob::Post(uid) => {
            let outcome = pages::fetch_post(client, prismic, uid, reference).await?;
            state.generator.render_outcome(&outcome)
        }
    }
}

/// Preview requests bypass the cache
async fn render_preview(state: &AppState, job: PageJob, reference: String) -> Response {
    match generate_page(state, &job, Some(reference)).await {
        Ok(output) => respond(&output),
        Err(e) => {
            tracing::error!("Failed to render preview of {}: {:#}", job.route(), e);
            (StatusCode::BAD_GATEWAY, "Preview unavailable").into_response()
        }
    }
}

fn respond(output: &Rendered) -> Response {
    match output {
        Rendered::Html(html) => Html(html.clone()).into_response(),
        Rendered::Redirect(location) => Redirect::temporary(location).into_response(),
    }
}

fn placeholder(state: &AppState) -> Response {
    match state.generator.render_placeholder() {
        Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render placeholder: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct MoreQuery {
    cursor: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Next page of list entries for the "load more" button
async fn more_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoreQuery>,
) -> Response {
    match pages::fetch_more(state.client.as_ref(), &query.cursor).await {
        Ok(more) => match state
            .generator
            .render_more(&more.posts, more.next_page.as_deref().map(more_posts_url))
        {
            Ok(page) => Json(page).into_response(),
            Err(e) => {
                tracing::error!("Failed to render posts: {:#}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "render failed")
            }
        },
        Err(e @ ContentError::ForeignCursor(_)) => {
            tracing::warn!("{}", e);
            error_response(StatusCode::BAD_REQUEST, e)
        }
        Err(e) => {
            tracing::error!("Failed to load more posts: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    token: String,
    #[serde(rename = "documentId")]
    document_id: String,
}

/// Enter preview mode and open the previewed document
async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
    jar: CookieJar,
) -> Response {
    let options = QueryOptions::new().reference(Some(query.token.clone()));
    let location = match state.client.get_by_id(&query.document_id, &options).await {
        Ok(Some(document)) => match document.uid {
            Some(uid) => post_path(&uid),
            None => HOME_PATH.to_string(),
        },
        Ok(None) => HOME_PATH.to_string(),
        Err(e) => {
            tracing::error!("Failed to resolve preview document: {}", e);
            return error_response(StatusCode::BAD_GATEWAY, e);
        }
    };

    let cookie = Cookie::build((PREVIEW_COOKIE, query.token))
        .path("/")
        .http_only(true)
        .build();
    (jar.add(cookie), Redirect::temporary(&location)).into_response()
}

/// Leave preview mode
async fn exit_preview_handler(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(PREVIEW_COOKIE).path("/"));
    (jar, Redirect::temporary(HOME_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StateKind;
    use crate::prismic::{MemoryClient, RawDocument};
    use crate::Site;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn doc(id: &str, uid: &str, published: &str) -> RawDocument {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "uid": uid,
            "type": "posts",
            "first_publication_date": published,
            "last_publication_date": published,
            "data": {
                "title": format!("Title of {}", uid),
                "subtitle": "sub",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.prismic.io/banner.png" },
                "content": []
            }
        }))
        .unwrap()
    }

    fn state_with(client: Arc<MemoryClient>) -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let generator = Generator::new(&site).unwrap();
        (dir, Arc::new(AppState::new(generator, client)))
    }

    fn memory_client() -> Arc<MemoryClient> {
        Arc::new(MemoryClient::new(vec![
            doc("1", "first-post", "2021-03-15T19:25:28+0000"),
            doc("2", "second-post", "2021-03-25T19:25:28+0000"),
        ]))
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        get_with(state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_with(
        state: &Arc<AppState>,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn wait_for_prebuilt(state: &AppState, route: &str) {
        for _ in 0..200 {
            if state.cache.state(route).await == Some(StateKind::Prebuilt) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} was never generated", route);
    }

    #[tokio::test]
    async fn test_post_generated_on_demand() {
        let (_dir, state) = state_with(memory_client());

        let (status, _, body) = get(&state, "/post/first-post").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        wait_for_prebuilt(&state, "/post/first-post").await;
        let (status, _, body) = get(&state, "/post/first-post").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Title of first-post | spacetraveling"));
    }

    #[tokio::test]
    async fn test_unknown_post_redirects_home() {
        let (_dir, state) = state_with(memory_client());
        get(&state, "/post/missing").await;
        wait_for_prebuilt(&state, "/post/missing").await;

        let (status, headers, _) = get(&state, "/post/missing").await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/");
        assert_eq!(state.cache.state("/post/missing").await, None);
    }

    #[tokio::test]
    async fn test_unknown_posts_leave_no_entries() {
        let (_dir, state) = state_with(memory_client());
        for i in 0..20 {
            let route = format!("/post/nope-{}", i);
            get(&state, &route).await;
            wait_for_prebuilt(&state, &route).await;
            let (status, _, _) = get(&state, &route).await;
            assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        }
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_generation_is_retried() {
        let client = memory_client();
        let (_dir, state) = state_with(client.clone());
        client.set_offline(true);

        get(&state, "/post/first-post").await;
        for _ in 0..200 {
            if state.cache.state("/post/first-post").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.cache.state("/post/first-post").await, None);

        client.set_offline(false);
        let (_, _, body) = get(&state, "/post/first-post").await;
        assert!(body.contains("Carregando..."));
        wait_for_prebuilt(&state, "/post/first-post").await;
    }

    #[tokio::test]
    async fn test_prebuilt_page_served_from_cache() {
        let (_dir, state) = state_with(memory_client());
        state
            .cache
            .insert_prebuilt("/", Rendered::Html("<p>cached</p>".to_string()))
            .await;

        let (status, _, body) = get(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>cached</p>");
    }

    #[tokio::test]
    async fn test_load_more() {
        let client = memory_client();
        let (_dir, state) = state_with(client.clone());
        let home = pages::fetch_home(client.as_ref(), &Default::default(), None)
            .await
            .unwrap();
        let cursor = home.posts.cursor().unwrap().to_string();
        let uri = format!(
            "/api/posts/more?cursor={}",
            percent_encoding::utf8_percent_encode(&cursor, percent_encoding::NON_ALPHANUMERIC)
        );

        let (status, _, body) = get(&state, &uri).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["html"].as_str().unwrap().contains("Title of second-post"));
        assert!(json["next"].is_null());
    }

    #[tokio::test]
    async fn test_served_index_loads_more_from_api() {
        let (_dir, state) = state_with(memory_client());
        get(&state, "/").await;
        wait_for_prebuilt(&state, "/").await;

        let (_, _, body) = get(&state, "/").await;
        let body = body.replace("&#x2F;", "/");
        let start = body.find(r#"data-next=""#).unwrap() + r#"data-next=""#.len();
        let end = start + body[start..].find('"').unwrap();
        let next = &body[start..end];
        assert!(next.starts_with("/api/posts/more?cursor="));

        let (status, _, more) = get(&state, next).await;
        assert_eq!(status, StatusCode::OK);
        assert!(more.contains("Title of second-post"));
    }

    #[tokio::test]
    async fn test_load_more_rejects_foreign_cursor() {
        let (_dir, state) = state_with(memory_client());
        let (status, _, body) =
            get(&state, "/api/posts/more?cursor=http%3A%2F%2Fexample.com%2F").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("error"));
    }

    #[tokio::test]
    async fn test_load_more_failure_is_bad_gateway() {
        let client = memory_client();
        let (_dir, state) = state_with(client.clone());
        let home = pages::fetch_home(client.as_ref(), &Default::default(), None)
            .await
            .unwrap();
        let cursor = home.posts.cursor().unwrap().to_string();
        client.set_offline(true);

        let uri = format!(
            "/api/posts/more?cursor={}",
            percent_encoding::utf8_percent_encode(&cursor, percent_encoding::NON_ALPHANUMERIC)
        );
        let (status, _, _) = get(&state, &uri).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_preview_sets_cookie_and_redirects() {
        let (_dir, state) = state_with(memory_client());
        let (status, headers, _) =
            get(&state, "/api/preview?token=preview-ref&documentId=2").await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/post/second-post");
        let cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("io.prismic.preview=preview-ref"));
    }

    #[tokio::test]
    async fn test_preview_bypasses_cache() {
        let (_dir, state) = state_with(memory_client());
        let request = Request::builder()
            .uri("/post/first-post")
            .header(header::COOKIE, "io.prismic.preview=preview-ref")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = get_with(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Sair do modo Preview"));
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_exit_preview_clears_cookie() {
        let (_dir, state) = state_with(memory_client());
        let request = Request::builder()
            .uri("/api/exit-preview")
            .header(header::COOKIE, "io.prismic.preview=preview-ref")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = get_with(&state, request).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/");
        let cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("io.prismic.preview="));
        assert!(cookie.contains("Max-Age=0"));
    }
}
