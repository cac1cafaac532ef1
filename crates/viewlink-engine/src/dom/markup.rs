//! Load (X)HTML markup into a [`Document`].
//!
//! The loader is lenient in the ways rendered documentation pages need:
//! void elements never take children, unclosed elements are closed by the
//! nearest matching end tag, stray end tags are ignored, HTML named entities
//! are resolved and valueless attributes are accepted.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{Document, ElementKind, NodeData, NodeId};

#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Malformed markup at byte {position}: {source}")]
    Syntax {
        position: u64,
        source: quick_xml::Error,
    },
    #[error("Malformed attribute on <{tag}>: {reason}")]
    Attribute { tag: String, reason: String },
}

/// Parse markup into a fresh document.
pub fn parse_document(markup: &str) -> Result<Document, MarkupError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![doc.root()];

    loop {
        let current = stack.last().copied().unwrap_or_else(|| doc.root());
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = append_start(&mut doc, current, &e)?;
                if !is_self_closing(&doc, element) {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(e)) => {
                append_start(&mut doc, current, &e)?;
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                // Skip index 0: the document root is never closed by markup.
                if let Some(open_at) = stack
                    .iter()
                    .rposition(|&id| doc.tag(id) == Some(tag.as_str()))
                    .filter(|&at| at > 0)
                {
                    stack.truncate(open_at);
                }
            }
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(&e);
                push_text(&mut doc, current, &unescape_lenient(&raw));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut doc, current, &text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(source) => {
                return Err(MarkupError::Syntax {
                    position: reader.error_position() as u64,
                    source,
                });
            }
        }
    }

    Ok(doc)
}

fn append_start(
    doc: &mut Document,
    parent: NodeId,
    start: &BytesStart<'_>,
) -> Result<NodeId, MarkupError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    for attr in start.html_attributes() {
        let attr = attr.map_err(|err| MarkupError::Attribute {
            tag: tag.clone(),
            reason: err.to_string(),
        })?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = unescape_lenient(&String::from_utf8_lossy(&attr.value)).into_owned();
        attrs.push((name, value));
    }
    let borrowed: Vec<(&str, &str)> = attrs
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    Ok(doc.append_element(parent, &tag, &borrowed))
}

/// Resolve entity references, leaving a bare `&` or an unknown entity as written.
fn unescape_lenient(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = unescape_with(raw, resolve_html5_entity) {
        return text;
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let resolved = rest.find(';').and_then(|end| {
            let text = unescape_with(&rest[..=end], resolve_html5_entity).ok()?;
            Some((text, end + 1))
        });
        match resolved {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn is_self_closing(doc: &Document, element: NodeId) -> bool {
    match doc.tag(element) {
        Some("link" | "meta" | "base") => true,
        Some(tag) => ElementKind::from_tag(tag).is_void(),
        None => false,
    }
}

/// Whitespace-only text is only kept where it can separate inline content.
fn push_text(doc: &mut Document, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    if text.trim().is_empty() {
        let inline_parent = matches!(
            doc.kind(parent),
            Some(ElementKind::Content | ElementKind::Heading(_))
        );
        if !inline_parent {
            return;
        }
    }
    // Adjacent text (e.g. split around an entity) is merged into one node.
    if let Some(&last) = doc.children(parent).last()
        && matches!(doc.data(last), NodeData::Text(_))
    {
        let merged = format!("{}{}", doc.text_content(last), text);
        doc.replace_text(last, merged);
        return;
    }
    doc.append_text(parent, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_nested_structure() {
        let doc = parse_document(
            r#"<html><body><div id="sec"><p>One</p><p>Two</p></div></body></html>"#,
        )
        .unwrap();
        let section = doc.elements_by_id("sec")[0];
        let paragraphs = doc.elements_by_tag(section, "p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(doc.text_content(paragraphs[1]), "Two");
        assert_eq!(doc.parent(section), Some(doc.body()));
    }

    #[test]
    fn test_void_elements_take_no_children() {
        let doc = parse_document("<body><p>a<br>b</p><img src=\"x.png\"><p>c</p></body>").unwrap();
        let paragraphs = doc.elements_by_tag(doc.body(), "p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(doc.parent(paragraphs[1]), Some(doc.body()));
        assert_eq!(doc.text_content(paragraphs[0]), "ab");
    }

    #[test]
    fn test_unclosed_elements_are_closed_by_ancestor_end_tag() {
        let doc = parse_document("<body><ul><li>one<li>two</ul><p>after</p></body>").unwrap();
        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.parent(p), Some(doc.body()));
    }

    #[test]
    fn test_stray_end_tags_are_ignored() {
        let doc = parse_document("<body></span><p>ok</p></body>").unwrap();
        assert_eq!(doc.elements_by_tag(doc.body(), "p").len(), 1);
    }

    #[test]
    fn test_stray_end_tag_inside_full_page() {
        let doc =
            parse_document("<html><body><div><p>One</p></span></div><p>Two</p></body></html>")
                .unwrap();

        let paragraphs = doc.elements_by_tag(doc.body(), "p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(doc.parent(paragraphs[1]), Some(doc.body()));
        assert_eq!(doc.normalized_text(paragraphs[1]), "Two");
    }

    #[test]
    fn test_bare_ampersands_are_kept_as_text() {
        let doc = parse_document(
            r#"<html><body><p title="Q&amp;A & more">Tom & Jerry &amp; friends &bogus; x</p></body></html>"#,
        )
        .unwrap();

        let p = doc.elements_by_tag(doc.body(), "p")[0];
        assert_eq!(doc.normalized_text(p), "Tom & Jerry & friends &bogus; x");
        assert_eq!(doc.attr(p, "title"), Some("Q&A & more"));
    }

    #[test]
    fn test_html_entities_and_valueless_attributes() {
        let doc =
            parse_document("<body><details open><p>a&nbsp;b &amp; c</p></details></body>").unwrap();
        let details = doc.elements_by_tag(doc.body(), "details")[0];
        assert_eq!(doc.attr(details, "open"), Some(""));
        let p = doc.elements_by_tag(details, "p")[0];
        assert_eq!(doc.normalized_text(p), "a b & c");
    }

    #[test]
    fn test_whitespace_between_blocks_is_dropped() {
        let doc = parse_document("<body>\n  <p>One</p>\n  <p>Two</p>\n</body>").unwrap();
        assert_eq!(doc.children(doc.body()).len(), 2);
    }

    #[test]
    fn test_whitespace_between_inline_elements_is_kept() {
        let doc = parse_document("<p><em>a</em> <em>b</em></p>").unwrap();
        let p = doc.elements_by_tag(doc.root(), "p")[0];
        assert_eq!(doc.normalized_text(p), "a b");
    }
}
