use std::collections::BTreeSet;

use crate::dom::Document;

pub const TOGGLE_ATTR: &str = "data-toggle-id";
pub const TAB_GROUP_ATTR: &str = "data-tab-group";
pub const PLACEHOLDER_ATTR: &str = "data-placeholder";

/// Identifiers rendered on the current page.
///
/// Share links are scoped to these so a link made on one page never carries
/// identifiers that mean nothing on another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageElementRegistry {
    pub toggles: BTreeSet<String>,
    pub tab_groups: BTreeSet<String>,
    pub placeholders: BTreeSet<String>,
}

impl PageElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every toggle, tab group and placeholder marked in `doc`.
    pub fn scan(doc: &Document) -> Self {
        let mut registry = Self::default();
        for node in doc.descendants(doc.root()) {
            let marked = [
                (TOGGLE_ATTR, &mut registry.toggles),
                (TAB_GROUP_ATTR, &mut registry.tab_groups),
                (PLACEHOLDER_ATTR, &mut registry.placeholders),
            ];
            for (attr, ids) in marked {
                if let Some(value) = doc.attr(node, attr)
                    && !value.is_empty()
                {
                    ids.insert(value.to_string());
                }
            }
        }
        log::debug!(
            "page registry: {} toggle(s), {} tab group(s), {} placeholder(s)",
            registry.toggles.len(),
            registry.tab_groups.len(),
            registry.placeholders.len()
        );
        registry
    }

    /// Merge a later scan. Re-merging the same scan changes nothing.
    pub fn extend(&mut self, other: &PageElementRegistry) {
        self.toggles.extend(other.toggles.iter().cloned());
        self.tab_groups.extend(other.tab_groups.iter().cloned());
        self.placeholders.extend(other.placeholders.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty() && self.tab_groups.is_empty() && self.placeholders.is_empty()
    }
}
