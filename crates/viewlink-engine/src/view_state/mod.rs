/*!
 * # View State
 *
 * Application state that travels with a shared link besides the focus token:
 * toggle visibility, tab-group selections and named text substitutions.
 *
 * - **`ViewState`**: the resolved state. Every toggle is in at most one of the
 *   shown, peek or hidden sets.
 * - **`ViewStateDelta`**: a sparse update, as parsed from a link. Anything it
 *   does not mention is left alone.
 * - **`query`**: query-string parsing and page-scoped share link generation.
 * - **`registry`**: identifiers actually present on the current page.
 * - **`store`**: precedence (defaults, then persisted, then link) and persistence.
 */

mod bindings;
pub mod query;
mod registry;
mod store;

pub use bindings::{PlaceholderBinding, PlaceholderBindings};
pub use query::{
    PARAM_HIDE, PARAM_PEEK, PARAM_PLACEHOLDERS, PARAM_SHOW, PARAM_TABS, compose_share_url,
    generate_share_query, parse_query, query_param, strip_managed_params,
};
pub use registry::PageElementRegistry;
pub use store::{KeyValueStore, MemoryStore, StorageError, ViewStateStore};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleState {
    Shown,
    /// Partially revealed.
    Peek,
    Hidden,
}

impl ToggleState {
    /// Shown, then peek, then hidden, then shown again.
    pub fn next(self) -> Self {
        match self {
            Self::Shown => Self::Peek,
            Self::Peek => Self::Hidden,
            Self::Hidden => Self::Shown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub shown_toggles: BTreeSet<String>,
    pub peek_toggles: BTreeSet<String>,
    pub hidden_toggles: BTreeSet<String>,
    /// Selected tab per tab group.
    pub tabs: BTreeMap<String, String>,
    /// Substitution value per placeholder name.
    pub placeholders: BTreeMap<String, String>,
}

impl ViewState {
    /// State of a toggle, or `fallback` if no set mentions it.
    pub fn toggle_state(&self, id: &str, fallback: ToggleState) -> ToggleState {
        if self.shown_toggles.contains(id) {
            ToggleState::Shown
        } else if self.peek_toggles.contains(id) {
            ToggleState::Peek
        } else if self.hidden_toggles.contains(id) {
            ToggleState::Hidden
        } else {
            fallback
        }
    }

    /// Move a toggle into exactly one set.
    pub fn set_toggle(&mut self, id: &str, state: ToggleState) {
        self.shown_toggles.remove(id);
        self.peek_toggles.remove(id);
        self.hidden_toggles.remove(id);
        let target = match state {
            ToggleState::Shown => &mut self.shown_toggles,
            ToggleState::Peek => &mut self.peek_toggles,
            ToggleState::Hidden => &mut self.hidden_toggles,
        };
        target.insert(id.to_string());
    }

    /// Treat this full state as an update that mentions everything it holds.
    pub fn as_delta(&self) -> ViewStateDelta {
        ViewStateDelta {
            shown_toggles: Some(self.shown_toggles.clone()),
            peek_toggles: Some(self.peek_toggles.clone()),
            hidden_toggles: Some(self.hidden_toggles.clone()),
            tabs: Some(self.tabs.clone()),
            placeholders: Some(self.placeholders.clone()),
        }
    }
}

/// Sparse update to a [`ViewState`].
///
/// A `None` field was not mentioned at all; a `Some` field only affects the
/// identifiers it lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewStateDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shown_toggles: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peek_toggles: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_toggles: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholders: Option<BTreeMap<String, String>>,
}

impl ViewStateDelta {
    pub fn is_empty(&self) -> bool {
        self.shown_toggles.is_none()
            && self.peek_toggles.is_none()
            && self.hidden_toggles.is_none()
            && self.tabs.is_none()
            && self.placeholders.is_none()
    }

    /// Overlay this delta onto `state`.
    ///
    /// Mentioned toggles move into their set; mentioned tabs and placeholders
    /// are overwritten. Everything else is untouched.
    pub fn apply_to(&self, state: &mut ViewState) {
        let toggle_sets = [
            (&self.shown_toggles, ToggleState::Shown),
            (&self.peek_toggles, ToggleState::Peek),
            (&self.hidden_toggles, ToggleState::Hidden),
        ];
        for (ids, toggle_state) in toggle_sets {
            for id in ids.iter().flatten() {
                state.set_toggle(id, toggle_state);
            }
        }
        if let Some(tabs) = &self.tabs {
            state
                .tabs
                .extend(tabs.iter().map(|(group, tab)| (group.clone(), tab.clone())));
        }
        if let Some(placeholders) = &self.placeholders {
            state.placeholders.extend(
                placeholders
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }
    }
}
