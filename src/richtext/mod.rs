//! Structured rich text
//!
//! Blocks as stored by the content repository, with conversion to plain text
//! (for word counting) and to sanitized HTML (for display). Every piece of
//! text and every attribute value is escaped; links and images with unsafe
//! URL schemes lose their URL.

use serde::{Deserialize, Serialize};

use crate::helpers::{html_escape, is_safe_url};

/// Kind of a rich-text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

/// Kind of an inline span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    #[serde(rename = "strong")]
    Strong,
    #[serde(rename = "em")]
    Em,
    #[serde(rename = "hyperlink")]
    Hyperlink,
    #[serde(rename = "label")]
    Label,
    #[serde(other)]
    Unknown,
}

/// Extra data carried by hyperlink and label spans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanData {
    pub url: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
}

/// Inline formatting over a range of a block's text, in UTF-16 units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: SpanData,
}

/// Dimensions of an image block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Embedded media description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OEmbed {
    pub embed_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub provider_name: Option<String>,
    pub title: Option<String>,
}

/// One block of rich text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub oembed: Option<OEmbed>,
}

impl Block {
    /// Plain paragraph without spans
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
            url: None,
            alt: None,
            dimensions: None,
            oembed: None,
        }
    }

    pub fn with_kind(mut self, kind: BlockKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}

/// Concatenate the text of all blocks, separated by a space
pub fn as_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render blocks to sanitized HTML
pub fn as_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list = match block.kind {
            BlockKind::ListItem => Some("ul"),
            BlockKind::OrderedListItem => Some("ol"),
            _ => None,
        };
        if list != open_list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }
        html.push_str(&render_block(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_block(block: &Block) -> String {
    let inline = || render_spans(&block.text, &block.spans);
    match block.kind {
        BlockKind::Paragraph | BlockKind::Unknown => format!("<p>{}</p>", inline()),
        BlockKind::Heading1 => format!("<h1>{}</h1>", inline()),
        BlockKind::Heading2 => format!("<h2>{}</h2>", inline()),
        BlockKind::Heading3 => format!("<h3>{}</h3>", inline()),
        BlockKind::Heading4 => format!("<h4>{}</h4>", inline()),
        BlockKind::Heading5 => format!("<h5>{}</h5>", inline()),
        BlockKind::Heading6 => format!("<h6>{}</h6>", inline()),
        BlockKind::Preformatted => format!("<pre>{}</pre>", inline()),
        BlockKind::ListItem | BlockKind::OrderedListItem => format!("<li>{}</li>", inline()),
        BlockKind::Image => render_image(block),
        BlockKind::Embed => render_embed(block),
    }
}

fn render_image(block: &Block) -> String {
    let src = block.url.as_deref().filter(|u| is_safe_url(u));
    let Some(src) = src else {
        return String::new();
    };
    let alt = html_escape(block.alt.as_deref().unwrap_or(""));
    let size = block
        .dimensions
        .map(|d| format!(r#" width="{}" height="{}""#, d.width, d.height))
        .unwrap_or_default();
    format!(
        r#"<p class="block-img"><img src="{}" alt="{}"{} /></p>"#,
        html_escape(src),
        alt,
        size
    )
}

/// Embeds become a link; third-party embed markup is never inlined
fn render_embed(block: &Block) -> String {
    let oembed = block.oembed.clone().unwrap_or_default();
    let Some(url) = oembed.embed_url.as_deref().filter(|u| is_safe_url(u)) else {
        return String::new();
    };
    let url = html_escape(url);
    let title = oembed
        .title
        .as_deref()
        .map(html_escape)
        .unwrap_or_else(|| url.clone());
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}"><a href="{}" target="_blank" rel="noopener">{}</a></div>"#,
        url,
        html_escape(oembed.kind.as_deref().unwrap_or("")),
        html_escape(&oembed.provider_name.unwrap_or_default().to_lowercase()),
        url,
        title
    )
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => match span.data.url.as_deref().filter(|u| is_safe_url(u)) {
            Some(url) => {
                let target = match span.data.target.as_deref() {
                    Some(target) => format!(
                        r#" target="{}" rel="noopener noreferrer""#,
                        html_escape(target)
                    ),
                    None => String::new(),
                };
                format!(r#"<a href="{}"{}>"#, html_escape(url), target)
            }
            None => "<span>".to_string(),
        },
        SpanKind::Label => format!(
            r#"<span class="{}">"#,
            html_escape(span.data.label.as_deref().unwrap_or(""))
        ),
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink if span.data.url.as_deref().is_some_and(is_safe_url) => "</a>",
        _ => "</span>",
    }
}

/// Apply spans to text. Offsets count UTF-16 code units, as the API
/// reports them; overlapping spans are split so that the output stays well
/// nested.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    // UTF-16 offset at which each char starts
    let offsets: Vec<usize> = chars
        .iter()
        .scan(0, |offset, c| {
            let start = *offset;
            *offset += c.len_utf16();
            Some(start)
        })
        .collect();
    let to_char = |utf16: usize| offsets.partition_point(|&o| o < utf16);

    let mut spans: Vec<(usize, usize, &Span)> = spans
        .iter()
        .map(|s| (to_char(s.start), to_char(s.end), s))
        .filter(|(start, end, _)| start < end)
        .collect();
    // Outer spans open first
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<(usize, &Span)> = Vec::new();
    let mut next = 0;

    for i in 0..=len {
        // Close everything ending here, reopening spans that continue
        if stack.iter().any(|(end, _)| *end == i) {
            let mut reopen = Vec::new();
            while let Some((end, span)) = stack.pop() {
                out.push_str(close_tag(span));
                if end != i {
                    reopen.push((end, span));
                }
            }
            for (end, span) in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                stack.push((end, span));
            }
        }

        while next < spans.len() && spans[next].0 == i {
            let (_, end, span) = spans[next];
            out.push_str(&open_tag(span));
            stack.push((end, span));
            next += 1;
        }

        if i < len {
            match chars[i] {
                '\n' => out.push_str("<br />"),
                c => out.push_str(&html_escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, kind: SpanKind) -> Span {
        Span {
            start,
            end,
            kind,
            data: SpanData::default(),
        }
    }

    fn link(start: usize, end: usize, url: &str) -> Span {
        Span {
            start,
            end,
            kind: SpanKind::Hyperlink,
            data: SpanData {
                url: Some(url.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_as_text() {
        let blocks = vec![Block::paragraph("Hello world"), Block::paragraph("again")];
        assert_eq!(as_text(&blocks), "Hello world again");
        assert_eq!(as_text(&[]), "");
    }

    #[test]
    fn test_paragraph_escapes_text() {
        let html = as_html(&[Block::paragraph("1 < 2 & <script>")]);
        assert_eq!(html, "<p>1 &lt; 2 &amp; &lt;script&gt;</p>");
    }

    #[test]
    fn test_headings_and_newlines() {
        let blocks = vec![
            Block::paragraph("Title").with_kind(BlockKind::Heading2),
            Block::paragraph("a\nb"),
        ];
        assert_eq!(as_html(&blocks), "<h2>Title</h2><p>a<br />b</p>");
    }

    #[test]
    fn test_list_items_are_grouped() {
        let blocks = vec![
            Block::paragraph("one").with_kind(BlockKind::ListItem),
            Block::paragraph("two").with_kind(BlockKind::ListItem),
            Block::paragraph("first").with_kind(BlockKind::OrderedListItem),
            Block::paragraph("after"),
        ];
        assert_eq!(
            as_html(&blocks),
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
        );
    }

    #[test]
    fn test_nested_spans() {
        let block = Block::paragraph("bold and italic")
            .with_span(span(0, 15, SpanKind::Strong))
            .with_span(span(9, 15, SpanKind::Em));
        assert_eq!(
            as_html(&[block]),
            "<p><strong>bold and <em>italic</em></strong></p>"
        );
    }

    #[test]
    fn test_overlapping_spans_stay_nested() {
        let block = Block::paragraph("abcd")
            .with_span(span(0, 3, SpanKind::Strong))
            .with_span(span(1, 4, SpanKind::Em));
        assert_eq!(
            as_html(&[block]),
            "<p><strong>a<em>bc</em></strong><em>d</em></p>"
        );
    }

    #[test]
    fn test_span_offsets_are_not_bytes() {
        let block = Block::paragraph("ação rápida").with_span(span(5, 11, SpanKind::Em));
        assert_eq!(as_html(&[block]), "<p>ação <em>rápida</em></p>");
    }

    #[test]
    fn test_span_offsets_count_utf16_units() {
        // The rocket takes two UTF-16 units
        let block =
            Block::paragraph("🚀 lançamento rápido").with_span(span(3, 13, SpanKind::Strong));
        assert_eq!(
            as_html(&[block]),
            "<p>🚀 <strong>lançamento</strong> rápido</p>"
        );
    }

    #[test]
    fn test_hyperlinks_are_sanitized() {
        let safe = Block::paragraph("docs").with_span(link(0, 4, "https://example.com/?a=1&b=\"2\""));
        assert_eq!(
            as_html(&[safe]),
            r#"<p><a href="https://example.com/?a=1&amp;b=&quot;2&quot;">docs</a></p>"#
        );

        let unsafe_link = Block::paragraph("click").with_span(link(0, 5, "javascript:alert(1)"));
        assert_eq!(as_html(&[unsafe_link]), "<p><span>click</span></p>");
    }

    #[test]
    fn test_out_of_range_spans_are_clamped() {
        let block = Block::paragraph("abc")
            .with_span(span(1, 99, SpanKind::Strong))
            .with_span(span(5, 6, SpanKind::Em));
        assert_eq!(as_html(&[block]), "<p>a<strong>bc</strong></p>");
    }

    #[test]
    fn test_image_and_embed() {
        let image = Block {
            url: Some("https://images.prismic.io/x.png".to_string()),
            alt: Some("a \"cat\"".to_string()),
            ..Block::paragraph("").with_kind(BlockKind::Image)
        };
        assert_eq!(
            as_html(&[image]),
            r#"<p class="block-img"><img src="https://images.prismic.io/x.png" alt="a &quot;cat&quot;" /></p>"#
        );

        let embed = Block {
            oembed: Some(OEmbed {
                embed_url: Some("https://youtu.be/abc".to_string()),
                kind: Some("video".to_string()),
                provider_name: Some("YouTube".to_string()),
                title: None,
            }),
            ..Block::paragraph("").with_kind(BlockKind::Embed)
        };
        let html = as_html(&[embed]);
        assert!(html.contains(r#"data-oembed-provider="youtube""#));
        assert!(html.contains(r#"<a href="https://youtu.be/abc""#));
    }

    #[test]
    fn test_deserialize_blocks() {
        let json = r#"[
            { "type": "paragraph", "text": "Hi there", "spans": [
                { "start": 0, "end": 2, "type": "hyperlink",
                  "data": { "link_type": "Web", "url": "https://a.b" } }
            ] },
            { "type": "mystery-block", "text": "x" }
        ]"#;
        let blocks: Vec<Block> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks[0].spans[0].kind, SpanKind::Hyperlink);
        assert_eq!(blocks[1].kind, BlockKind::Unknown);
        assert_eq!(
            as_html(&blocks),
            r#"<p><a href="https://a.b">Hi</a> there</p><p>x</p>"#
        );
    }
}
