use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ViewState;

/// A placeholder whose value follows the selected tab of one tab group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderBinding {
    pub group: String,
    /// Placeholder value for each tab of `group`.
    pub values: BTreeMap<String, String>,
}

/// Placeholders derived from tab selections, keyed by placeholder name.
///
/// The tab selection is the source of truth for a bound placeholder, so bound
/// placeholders are never written into share links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderBindings {
    bindings: BTreeMap<String, PlaceholderBinding>,
}

impl PlaceholderBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(
        &mut self,
        placeholder: impl Into<String>,
        group: impl Into<String>,
        values: impl IntoIterator<Item = (String, String)>,
    ) {
        self.bindings.insert(
            placeholder.into(),
            PlaceholderBinding {
                group: group.into(),
                values: values.into_iter().collect(),
            },
        );
    }

    pub fn is_bound(&self, placeholder: &str) -> bool {
        self.bindings.contains_key(placeholder)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Overwrite every bound placeholder from its group's selected tab.
    ///
    /// A group with no selection, or a tab with no mapped value, leaves the
    /// placeholder as it was.
    pub fn apply(&self, state: &mut ViewState) {
        for (placeholder, binding) in &self.bindings {
            let value = state
                .tabs
                .get(&binding.group)
                .and_then(|tab| binding.values.get(tab));
            if let Some(value) = value {
                state.placeholders.insert(placeholder.clone(), value.clone());
            }
        }
    }
}
