//! HTML helper functions

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Whether a URL may be emitted into an `href` or `src` attribute
///
/// Relative paths, fragments and http(s)/mailto links pass; `javascript:`,
/// `data:` and other schemes do not.
pub fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    if url.starts_with("//") {
        return true;
    }
    if url.starts_with('/') || url.starts_with('#') || url.starts_with('?') {
        return true;
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
    {
        return true;
    }
    // No scheme at all means a relative path
    match url.find(':') {
        Some(colon) => url[..colon].contains(|c| matches!(c, '/' | '?' | '#')),
        None => true,
    }
}

/// Standalone page that sends the browser to `location`
///
/// Static output has no way to answer with a redirect status.
pub fn redirect_page(location: &str) -> String {
    let location = html_escape(location);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="0; url={0}">
<link rel="canonical" href="{0}">
</head>
<body><a href="{0}">{0}</a></body>
</html>
"#,
        location
    )
}
