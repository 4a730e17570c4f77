//! Rich text to HTML
//!
//! Renders the structured-text blocks of a post section. Inline spans
//! address the block text by UTF-16 offsets, as produced by the CMS editor.

use serde::Deserialize;
use serde_json::Value;

use super::post::TextBlock;
use crate::helpers::{encode_segment, html_escape};

/// Renders rich-text blocks to HTML
#[derive(Debug, Clone)]
pub struct RichTextRenderer {
    root: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone)]
enum Mark {
    Strong,
    Em,
    Label(String),
    Link { href: String, target: Option<String> },
}

#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    mark: Mark,
}

impl RichTextRenderer {
    /// `root` is the site root used for links to other documents
    pub fn new(root: &str) -> Self {
        let root = format!("{}/", root.trim_end_matches('/'));
        Self { root }
    }

    /// Render a sequence of blocks
    pub fn render(&self, blocks: &[TextBlock]) -> String {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in blocks {
            let list = match block.kind() {
                "list-item" => Some(ListKind::Unordered),
                "o-list-item" => Some(ListKind::Ordered),
                _ => None,
            };

            if open_list != list {
                if let Some(kind) = open_list {
                    html.push_str(&format!("</{}>", kind.tag()));
                }
                if let Some(kind) = list {
                    html.push_str(&format!("<{}>", kind.tag()));
                }
                open_list = list;
            }

            self.render_block(block, &mut html);
        }

        if let Some(kind) = open_list {
            html.push_str(&format!("</{}>", kind.tag()));
        }

        html
    }

    fn render_block(&self, block: &TextBlock, html: &mut String) {
        let kind = block.kind();
        let tag = match kind {
            "paragraph" => "p",
            "heading1" => "h1",
            "heading2" => "h2",
            "heading3" => "h3",
            "heading4" => "h4",
            "heading5" => "h5",
            "heading6" => "h6",
            "preformatted" => "pre",
            "list-item" | "o-list-item" => "li",
            "image" => return self.render_image(block, html),
            "embed" => return render_embed(block, html),
            other => {
                tracing::debug!("Skipping rich text block of type {:?}", other);
                return;
            }
        };

        html.push_str(&format!("<{}>", tag));
        let spans = self.spans(block);
        render_spans(&block.text, 0, block.text.len(), spans, html);
        html.push_str(&format!("</{}>", tag));
    }

    fn render_image(&self, block: &TextBlock, html: &mut String) {
        let Some(url) = block.markup.get("url").and_then(Value::as_str) else {
            return;
        };
        let alt = block
            .markup
            .get("alt")
            .and_then(Value::as_str)
            .unwrap_or("");
        let img = format!(
            r#"<img src="{}" alt="{}" />"#,
            html_escape(url),
            html_escape(alt)
        );

        html.push_str(r#"<p class="block-img">"#);
        match block.markup.get("linkTo").and_then(|l| self.link_href(l)) {
            Some(href) => {
                html.push_str(&format!(r#"<a href="{}">{}</a>"#, html_escape(&href), img));
            }
            None => html.push_str(&img),
        }
        html.push_str("</p>");
    }

    fn spans(&self, block: &TextBlock) -> Vec<Span> {
        let raw: Vec<RawSpan> = block
            .markup
            .get("spans")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        raw.into_iter()
            .filter_map(|span| {
                let start = utf16_to_byte(&block.text, span.start);
                let end = utf16_to_byte(&block.text, span.end);
                if start >= end {
                    return None;
                }
                let mark = match span.kind.as_str() {
                    "strong" => Mark::Strong,
                    "em" => Mark::Em,
                    "label" => Mark::Label(
                        span.data
                            .get("label")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    ),
                    "hyperlink" => Mark::Link {
                        href: self.link_href(&span.data)?,
                        target: span
                            .data
                            .get("target")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    },
                    _ => return None,
                };
                Some(Span { start, end, mark })
            })
            .collect()
    }

    /// Resolve a link object: web and media links by url, documents to their page
    fn link_href(&self, link: &Value) -> Option<String> {
        match link.get("link_type").and_then(Value::as_str) {
            Some("Document") => {
                let doc_type = link.get("type").and_then(Value::as_str)?;
                let uid = link.get("uid").and_then(Value::as_str)?;
                Some(format!(
                    "{}{}/{}/",
                    self.root,
                    encode_segment(doc_type),
                    encode_segment(uid)
                ))
            }
            _ => link
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

fn render_embed(block: &TextBlock, html: &mut String) {
    let Some(oembed) = block.markup.get("oembed") else {
        return;
    };
    let attr = |key: &str| {
        oembed
            .get(key)
            .and_then(Value::as_str)
            .map(html_escape)
            .unwrap_or_default()
    };
    html.push_str(&format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        attr("embed_url"),
        attr("type"),
        attr("provider_name"),
        oembed.get("html").and_then(Value::as_str).unwrap_or_default()
    ));
}

/// Emit `text[start..end]` wrapping every span, nesting spans that start
/// inside an earlier one and splitting those that cross its end.
fn render_spans(text: &str, start: usize, end: usize, mut spans: Vec<Span>, html: &mut String) {
    let mut cursor = start;
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    while !spans.is_empty() {
        let outer = spans.remove(0);
        push_text(&text[cursor..outer.start], html);

        let mut inner = Vec::new();
        let mut rest = Vec::new();
        for span in spans.drain(..) {
            if span.start < outer.end {
                if span.end <= outer.end {
                    inner.push(span);
                } else {
                    inner.push(Span {
                        end: outer.end,
                        ..span.clone()
                    });
                    rest.push(Span {
                        start: outer.end,
                        ..span
                    });
                }
            } else {
                rest.push(span);
            }
        }

        open_mark(&outer.mark, html);
        render_spans(text, outer.start, outer.end, inner, html);
        close_mark(&outer.mark, html);

        cursor = outer.end;
        spans = rest;
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    }

    push_text(&text[cursor..end], html);
}

fn open_mark(mark: &Mark, html: &mut String) {
    match mark {
        Mark::Strong => html.push_str("<strong>"),
        Mark::Em => html.push_str("<em>"),
        Mark::Label(label) => {
            html.push_str(&format!(r#"<span class="{}">"#, html_escape(label)))
        }
        Mark::Link { href, target } => match target {
            Some(target) => html.push_str(&format!(
                r#"<a target="{}" rel="noopener" href="{}">"#,
                html_escape(target),
                html_escape(href)
            )),
            None => html.push_str(&format!(r#"<a href="{}">"#, html_escape(href))),
        },
    }
}

fn close_mark(mark: &Mark, html: &mut String) {
    html.push_str(match mark {
        Mark::Strong => "</strong>",
        Mark::Em => "</em>",
        Mark::Label(_) => "</span>",
        Mark::Link { .. } => "</a>",
    });
}

fn push_text(text: &str, html: &mut String) {
    html.push_str(&html_escape(text).replace('\n', "<br />"));
}

/// Byte index of a UTF-16 offset, clamped to the end of `text`
fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for (index, c) in text.char_indices() {
        if units >= offset {
            return index;
        }
        units += c.len_utf16();
    }
    text.len()
}
