/*!
 * # Anchors
 *
 * Content-addressable names for document elements that survive unrelated
 * edits to the document.
 *
 * - **`AnchorDescriptor`**: plain value data describing one element at the
 *   moment it was shared (tag, position among same-tag elements in a scope,
 *   nearest id'd ancestor, text fingerprint, own id).
 * - **`codec`**: turns a list of descriptors into a URL-safe token and back.
 *   Id-only lists become a readable comma-separated list, everything else a
 *   base64 JSON payload.
 * - **`resolver`**: maps a descriptor back onto the live document using an id
 *   shortcut, a structural shortcut and finally a scored content scan.
 *
 * Descriptors never hold references into a document; resolution is always
 * performed fresh against a `Document` and a search root.
 */

pub mod codec;
pub mod resolver;

pub use codec::{TokenError, deserialize, serialize};
pub use resolver::{AnchorResolver, MatchPolicy, Resolution};

use crate::dom::text::{normalize_text, text_hash, text_snippet};
use crate::dom::{Document, NodeId};

/// What the resolver should match candidates against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorTag {
    /// Candidates must carry this (lower-cased) tag.
    Tag(String),
    /// Only the element id is known; structural search is not possible.
    IdOnly,
}

/// Immutable description of one element at share time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorDescriptor {
    pub tag: AnchorTag,
    /// Position among same-tag elements inside the scope at creation time.
    pub index: usize,
    /// Id of the nearest ancestor carrying one; narrows the resolution scope.
    pub parent_id: Option<String>,
    /// Normalized text prefix, at most [`SNIPPET_LEN`](crate::dom::text::SNIPPET_LEN) chars.
    pub text_snippet: String,
    /// Rolling hash of the full normalized text.
    pub text_hash: u32,
    /// The element's own id, enabling the exact shortcut.
    pub element_id: Option<String>,
}

impl AnchorDescriptor {
    /// A descriptor that only knows an element id, as produced by id-list tokens.
    pub fn id_only(element_id: impl Into<String>) -> Self {
        Self {
            tag: AnchorTag::IdOnly,
            index: 0,
            parent_id: None,
            text_snippet: String::new(),
            text_hash: 0,
            element_id: Some(element_id.into()),
        }
    }

    pub fn is_id_only(&self) -> bool {
        self.tag == AnchorTag::IdOnly
    }

    /// Describe `element` relative to `root`.
    ///
    /// The scope is the nearest ancestor with an id (searching up to and
    /// including `root`), falling back to `root` itself. Returns `None` when
    /// `element` is not an element or does not sit below its scope.
    pub fn create(doc: &Document, element: NodeId, root: NodeId) -> Option<Self> {
        let tag = doc.tag(element)?.to_string();

        let mut parent_id = None;
        let mut scope = root;
        for ancestor in doc.ancestors(element) {
            if let Some(id) = doc.element_id(ancestor) {
                parent_id = Some(id.to_string());
                scope = ancestor;
                break;
            }
            if ancestor == root {
                break;
            }
        }

        let Some(index) = doc
            .elements_by_tag(scope, &tag)
            .iter()
            .position(|&candidate| candidate == element)
        else {
            log::debug!("element {element:?} is not below its anchor scope {scope:?}");
            return None;
        };

        let normalized = normalize_text(&doc.text_content(element));
        Some(Self {
            tag: AnchorTag::Tag(tag),
            index,
            parent_id,
            text_snippet: text_snippet(&normalized),
            text_hash: text_hash(&normalized),
            element_id: doc.element_id(element).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><body>
        <h1>Guide</h1>
        <div id="sec">
            <p>First</p>
            <p>Correct One</p>
            <p id="third">Third   paragraph</p>
        </div>
        <p>Outside</p>
    </body></html>"#;

    #[test]
    fn test_create_scopes_to_nearest_id_ancestor() {
        let doc = parse_document(PAGE).unwrap();
        let section = doc.elements_by_id("sec")[0];
        let target = doc.elements_by_tag(section, "p")[1];

        let descriptor = AnchorDescriptor::create(&doc, target, doc.body()).unwrap();

        assert_eq!(
            descriptor,
            AnchorDescriptor {
                tag: AnchorTag::Tag("p".to_string()),
                index: 1,
                parent_id: Some("sec".to_string()),
                text_snippet: "Correct One".to_string(),
                text_hash: text_hash("Correct One"),
                element_id: None,
            }
        );
    }

    #[test]
    fn test_create_without_id_ancestor_uses_root_scope() {
        let doc = parse_document(PAGE).unwrap();
        let outside = *doc.elements_by_tag(doc.body(), "p").last().unwrap();

        let descriptor = AnchorDescriptor::create(&doc, outside, doc.body()).unwrap();

        assert_eq!(descriptor.parent_id, None);
        assert_eq!(descriptor.index, 3);
    }

    #[test]
    fn test_create_records_own_id_and_normalized_text() {
        let doc = parse_document(PAGE).unwrap();
        let third = doc.elements_by_id("third")[0];

        let descriptor = AnchorDescriptor::create(&doc, third, doc.body()).unwrap();

        assert_eq!(descriptor.element_id.as_deref(), Some("third"));
        assert_eq!(descriptor.text_snippet, "Third paragraph");
    }

    #[test]
    fn test_create_rejects_text_nodes() {
        let doc = parse_document(PAGE).unwrap();
        let third = doc.elements_by_id("third")[0];
        let text = doc.children(third)[0];
        assert_eq!(AnchorDescriptor::create(&doc, text, doc.body()), None);
    }

    #[test]
    fn test_create_rejects_elements_outside_root() {
        let doc = parse_document(PAGE).unwrap();
        let section = doc.elements_by_id("sec")[0];
        let outside = *doc.elements_by_tag(doc.body(), "p").last().unwrap();
        assert_eq!(AnchorDescriptor::create(&doc, outside, section), None);
    }
}
