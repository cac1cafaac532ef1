use std::collections::HashMap;
use thiserror::Error;

use super::query::generate_share_query;
use super::{PageElementRegistry, PlaceholderBindings, ToggleState, ViewState, ViewStateDelta};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access stored state at {location}: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },

    #[error("Failed to encode stored state: {source}")]
    Encode { source: serde_json::Error },
}

/// String key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Owns the resolved view state of one document.
///
/// Construction resolves configured defaults overlaid by persisted state.
/// A link is then overlaid with [`apply_url_delta`](Self::apply_url_delta),
/// which is not persisted; only explicit user changes are.
#[derive(Debug)]
pub struct ViewStateStore<S: KeyValueStore> {
    defaults: ViewState,
    bindings: PlaceholderBindings,
    storage: S,
    key: String,
    state: ViewState,
}

impl<S: KeyValueStore> ViewStateStore<S> {
    pub fn new(
        defaults: ViewState,
        bindings: PlaceholderBindings,
        storage: S,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let mut state = defaults.clone();
        if let Some(persisted) = load_persisted(&storage, &key) {
            persisted.as_delta().apply_to(&mut state);
        }
        bindings.apply(&mut state);
        Self {
            defaults,
            bindings,
            storage,
            key,
            state,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn bindings(&self) -> &PlaceholderBindings {
        &self.bindings
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Overlay a parsed link. Toggles, tabs and placeholders it does not
    /// mention keep their current values.
    pub fn apply_url_delta(&mut self, delta: &ViewStateDelta) {
        delta.apply_to(&mut self.state);
        self.bindings.apply(&mut self.state);
    }

    pub fn set_toggle(&mut self, id: &str, toggle: ToggleState) -> Result<(), StorageError> {
        self.state.set_toggle(id, toggle);
        self.persist()
    }

    /// Advance a toggle to its next state, starting from `fallback` when the
    /// toggle has no state yet.
    pub fn cycle_toggle(
        &mut self,
        id: &str,
        fallback: ToggleState,
    ) -> Result<ToggleState, StorageError> {
        let next = self.state.toggle_state(id, fallback).next();
        self.set_toggle(id, next)?;
        Ok(next)
    }

    pub fn select_tab(&mut self, group: &str, tab: &str) -> Result<(), StorageError> {
        self.state.tabs.insert(group.to_string(), tab.to_string());
        self.bindings.apply(&mut self.state);
        self.persist()
    }

    pub fn set_placeholder(&mut self, name: &str, value: &str) -> Result<(), StorageError> {
        self.state
            .placeholders
            .insert(name.to_string(), value.to_string());
        self.persist()
    }

    /// Return to the configured defaults and forget persisted state.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.state = self.defaults.clone();
        self.bindings.apply(&mut self.state);
        self.storage.remove(&self.key).inspect_err(|e| {
            log::warn!("could not clear stored view state {}: {e}", self.key);
        })
    }

    /// Absolute share query for the page described by `registry`.
    pub fn share_query(&self, registry: &PageElementRegistry) -> String {
        generate_share_query(&self.state, registry, &self.bindings)
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&self.state)
            .map_err(|source| StorageError::Encode { source })?;
        self.storage.set(&self.key, &encoded).inspect_err(|e| {
            log::warn!("could not persist view state {}: {e}", self.key);
        })
    }
}

fn load_persisted(storage: &impl KeyValueStore, key: &str) -> Option<ViewState> {
    let raw = match storage.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            log::warn!("could not read stored view state {key}: {e}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("ignoring unreadable stored view state {key}: {e}");
            None
        }
    }
}
