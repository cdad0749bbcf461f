//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Encode one path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Route of a post detail page
///
/// # Examples
/// ```ignore
/// post_path("como-utilizar-hooks") // -> "/post/como-utilizar-hooks"
/// ```
pub fn post_path(uid: &str) -> String {
    format!("/post/{}", encode_segment(uid))
}

/// Server endpoint behind the "load more" button
pub const MORE_POSTS_PATH: &str = "/api/posts/more";

/// Server URL of the list page that follows `cursor`
pub fn more_posts_url(cursor: &str) -> String {
    format!(
        "{}?cursor={}",
        MORE_POSTS_PATH,
        utf8_percent_encode(cursor, NON_ALPHANUMERIC)
    )
}

/// File of list page `page` in a generated site; page 1 is the index
pub fn list_page_path(page: usize) -> String {
    format!("/posts/page/{}.json", page)
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/a") // -> "https://example.com/post/a"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
