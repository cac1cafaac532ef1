use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use viewlink_engine::{ExclusionRules, MatchPolicy, PlaceholderBindings, ToggleState, ViewState};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON file holding persisted view state.
    pub state_path: PathBuf,
    pub resolver: MatchPolicy,
    pub visibility: ExclusionRules,
    pub view_state: ViewStateDefaults,
    pub share: ShareConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("~/.local/state/viewlink/state.json"),
            resolver: MatchPolicy::default(),
            visibility: ExclusionRules::default(),
            view_state: ViewStateDefaults::default(),
            share: ShareConfig::default(),
        }
    }
}

/// Initial view state before anything is persisted or linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewStateDefaults {
    pub shown: BTreeSet<String>,
    pub peek: BTreeSet<String>,
    pub hidden: BTreeSet<String>,
    /// State of a toggle that no set mentions.
    pub default_toggle: ToggleState,
    pub tabs: BTreeMap<String, String>,
    pub placeholders: BTreeMap<String, String>,
    pub bindings: PlaceholderBindings,
}

impl Default for ViewStateDefaults {
    fn default() -> Self {
        Self {
            shown: BTreeSet::new(),
            peek: BTreeSet::new(),
            hidden: BTreeSet::new(),
            default_toggle: ToggleState::Hidden,
            tabs: BTreeMap::new(),
            placeholders: BTreeMap::new(),
            bindings: PlaceholderBindings::default(),
        }
    }
}

impl ViewStateDefaults {
    pub fn to_view_state(&self) -> ViewState {
        let mut state = ViewState {
            tabs: self.tabs.clone(),
            placeholders: self.placeholders.clone(),
            ..ViewState::default()
        };
        // Later sets win if the same toggle is listed twice.
        for (ids, toggle) in [
            (&self.shown, ToggleState::Shown),
            (&self.peek, ToggleState::Peek),
            (&self.hidden, ToggleState::Hidden),
        ] {
            for id in ids {
                state.set_toggle(id, toggle);
            }
        }
        state
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Query parameter carrying the focus token.
    pub focus_param: String,
    /// Key the view state is persisted under.
    pub storage_key: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            focus_param: "focus".to_string(),
            storage_key: "viewlink-state".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.state_path = Self::expand_path(&config.state_path).unwrap_or(config.state_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Configuration from the default location, or defaults if there is none.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_else(|| {
            let mut config = Self::default();
            config.state_path =
                Self::expand_path(&config.state_path).unwrap_or(config.state_path);
            config
        }))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/viewlink");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
