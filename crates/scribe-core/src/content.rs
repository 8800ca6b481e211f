//! Content normalization into Confluence storage format.
//!
//! Input content arrives in a constrained markdown dialect (headings, lists,
//! bold/italic, links, inline code, fenced code blocks). The normalizer
//! converts it to the provider's storage XHTML. Constructs outside the
//! dialect pass through as escaped literal text rather than being dropped,
//! so normalization is lossless for unrecognized spans.
//!
//! Output starts with [`STORAGE_MARKER`]; normalizing already-normalized
//! content is a no-op, which lets update flows resubmit fetched content
//! safely.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

/// Leading marker identifying content already in storage format.
pub const STORAGE_MARKER: &str = "<!-- scribe:storage -->";

/// Content in the provider's storage representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContent {
    value: String,
}

impl NormalizedContent {
    /// The storage-format string, marker included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume into the storage-format string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }
}

/// Whether content is already in storage format.
#[must_use]
pub fn is_normalized(content: &str) -> bool {
    content.trim_start().starts_with(STORAGE_MARKER)
}

/// Convert raw markup to Confluence storage format.
///
/// Idempotent: content carrying the storage marker is returned unchanged.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedContent {
    if is_normalized(raw) {
        return NormalizedContent {
            value: raw.trim_start().to_string(),
        };
    }

    let mut out = String::with_capacity(raw.len() + STORAGE_MARKER.len() + 1);
    out.push_str(STORAGE_MARKER);
    out.push('\n');

    let mut code_block: Option<CodeBlock> = None;
    let mut image_urls: Vec<String> = Vec::new();

    for event in Parser::new(raw) {
        // Code block text is buffered raw and emitted as a CDATA macro body.
        if code_block.is_some() {
            match event {
                Event::Text(text) => {
                    if let Some(block) = code_block.as_mut() {
                        block.body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = code_block.take() {
                        push_code_macro(&mut out, &block);
                    }
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => out.push_str("<p>"),
                Tag::Heading { level, .. } => {
                    out.push('<');
                    out.push_str(heading_tag(level));
                    out.push('>');
                }
                Tag::BlockQuote(_) => out.push_str("<blockquote>"),
                Tag::CodeBlock(kind) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                            Some(lang.to_string())
                        }
                        _ => None,
                    };
                    code_block = Some(CodeBlock {
                        language,
                        body: String::new(),
                    });
                }
                Tag::List(Some(_)) => out.push_str("<ol>"),
                Tag::List(None) => out.push_str("<ul>"),
                Tag::Item => out.push_str("<li>"),
                Tag::Emphasis => out.push_str("<em>"),
                Tag::Strong => out.push_str("<strong>"),
                Tag::Link { dest_url, .. } => {
                    out.push_str("<a href=\"");
                    out.push_str(&escape_xml(&dest_url));
                    out.push_str("\">");
                }
                // Images are outside the dialect; keep the markdown literal.
                Tag::Image { dest_url, .. } => {
                    image_urls.push(dest_url.to_string());
                    out.push_str("![");
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph => out.push_str("</p>\n"),
                TagEnd::Heading(level) => {
                    out.push_str("</");
                    out.push_str(heading_tag(level));
                    out.push_str(">\n");
                }
                TagEnd::BlockQuote(_) => out.push_str("</blockquote>\n"),
                TagEnd::List(true) => out.push_str("</ol>\n"),
                TagEnd::List(false) => out.push_str("</ul>\n"),
                TagEnd::Item => out.push_str("</li>"),
                TagEnd::Emphasis => out.push_str("</em>"),
                TagEnd::Strong => out.push_str("</strong>"),
                TagEnd::Link => out.push_str("</a>"),
                TagEnd::Image => {
                    out.push_str("](");
                    out.push_str(&escape_xml(&image_urls.pop().unwrap_or_default()));
                    out.push(')');
                }
                _ => {}
            },
            Event::Text(text) => out.push_str(&escape_xml(&text)),
            Event::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_xml(&code));
                out.push_str("</code>");
            }
            // Raw HTML is not interpreted; it passes through as literal text.
            Event::Html(html) | Event::InlineHtml(html) => out.push_str(&escape_xml(&html)),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push_str("<br />"),
            Event::Rule => out.push_str("<hr />\n"),
            _ => {}
        }
    }

    NormalizedContent { value: out }
}

struct CodeBlock {
    language: Option<String>,
    body: String,
}

fn push_code_macro(out: &mut String, block: &CodeBlock) {
    out.push_str("<ac:structured-macro ac:name=\"code\">");
    if let Some(language) = &block.language {
        out.push_str("<ac:parameter ac:name=\"language\">");
        out.push_str(&escape_xml(language));
        out.push_str("</ac:parameter>");
    }
    out.push_str("<ac:plain-text-body><![CDATA[");
    // A literal "]]>" would terminate the CDATA section early.
    out.push_str(&block.body.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]></ac:plain-text-body></ac:structured-macro>\n");
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_structure() {
        let doc = normalize("# Release Notes\n\nSome *emphasis* and **weight**.\n");
        let value = doc.as_str();

        assert!(value.starts_with(STORAGE_MARKER));
        assert!(value.contains("<h1>Release Notes</h1>"));
        assert!(value.contains("<em>emphasis</em>"));
        assert!(value.contains("<strong>weight</strong>"));
    }

    #[test]
    fn test_lists_and_links() {
        let doc = normalize("- first\n- [docs](https://example.com/a?b=1&c=2)\n\n1. one\n");
        let value = doc.as_str();

        assert!(value.contains("<ul><li>first</li>"));
        assert!(value.contains("<a href=\"https://example.com/a?b=1&amp;c=2\">docs</a>"));
        assert!(value.contains("<ol><li>one</li></ol>"));
    }

    #[test]
    fn test_code_block_becomes_code_macro() {
        let doc = normalize("```rust\nfn main() { println!(\"hi\"); }\n```\n");
        let value = doc.as_str();

        assert!(value.contains("<ac:structured-macro ac:name=\"code\">"));
        assert!(value.contains("<ac:parameter ac:name=\"language\">rust</ac:parameter>"));
        assert!(value.contains("<![CDATA[fn main() { println!(\"hi\"); }\n]]>"));
    }

    #[test]
    fn test_unrecognized_html_passes_through_escaped() {
        let doc = normalize("text with <custom-tag attr=\"x\"/> inside\n");
        assert!(doc
            .as_str()
            .contains("&lt;custom-tag attr=&quot;x&quot;/&gt;"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("# Title\n\n- a\n- b\n");
        let twice = normalize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_inline_code() {
        let doc = normalize("run `cargo build` first\n");
        assert!(doc.as_str().contains("<code>cargo build</code>"));
    }
}
