//! Input tree layout (`eventdoc.yaml`).
//!
//! The layout file is optional. When present at the input root it can rename
//! the three top-level directories or restrict the event types that get a
//! subtree of their own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::model::EventType;
use crate::reference::normalize;

/// File name looked up at the input root when no explicit config path is given.
pub const CONFIG_FILE_NAME: &str = "eventdoc.yaml";

/// Directory names and event types making up an input tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub services_dir: String,
    pub channels_dir: String,
    pub messages_dir: String,
    pub event_types: Vec<EventType>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            services_dir: "services".to_string(),
            channels_dir: "channels".to_string(),
            messages_dir: "messages".to_string(),
            event_types: EventType::KNOWN.to_vec(),
        }
    }
}

impl LayoutConfig {
    /// Parse a layout config from YAML.
    pub fn from_yaml(input: &str) -> Result<Self, ResolveError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: LayoutConfig =
            serde_yaml::from_str(input).map_err(|e| ResolveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the layout for `root`.
    ///
    /// An explicit path must exist; otherwise `<root>/eventdoc.yaml` is used
    /// when present and the defaults when not.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ResolveError> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ResolveError::NotFound {
                        what: "layout config",
                        path: path.to_path_buf(),
                    });
                }
                path.to_path_buf()
            }
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = std::fs::read_to_string(&path)?;
        tracing::debug!(path = %path.display(), "loaded layout config");
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), ResolveError> {
        if self.event_types.contains(&EventType::Unknown) {
            return Err(ResolveError::Config(
                "'unknown' cannot be listed in event_types".into(),
            ));
        }
        for (name, value) in [
            ("services_dir", &self.services_dir),
            ("channels_dir", &self.channels_dir),
            ("messages_dir", &self.messages_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ResolveError::Config(format!("'{}' must not be empty", name)));
            }
        }
        Ok(())
    }
}

/// An input root together with its layout.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    config: LayoutConfig,
}

impl Layout {
    /// The root is normalized lexically (`./catalog` becomes `catalog`) so
    /// that paths derived from it compare equal to resolved `$ref` targets.
    pub fn new(root: impl Into<PathBuf>, config: LayoutConfig) -> Self {
        let root = normalize(&root.into());
        Self {
            root: if root.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                root
            },
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn services_dir(&self) -> PathBuf {
        self.root.join(&self.config.services_dir)
    }

    pub fn channels_dir(&self) -> PathBuf {
        self.root.join(&self.config.channels_dir)
    }

    pub fn messages_dir(&self) -> PathBuf {
        self.root.join(&self.config.messages_dir)
    }

    /// `messages/<type>`.
    pub fn type_dir(&self, event_type: EventType) -> PathBuf {
        self.messages_dir().join(event_type.as_str())
    }

    pub fn service_path(&self, name: &str) -> PathBuf {
        self.services_dir().join(format!("{}.yaml", name))
    }

    pub fn event_types(&self) -> &[EventType] {
        &self.config.event_types
    }

    pub fn has_subtree(&self, event_type: EventType) -> bool {
        self.config.event_types.contains(&event_type)
    }
}
