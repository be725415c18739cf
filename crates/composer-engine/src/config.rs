use std::path::Path;

use composer_types::Selector;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine settings.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selector the default accessory collection is registered under.
    pub default_selector: u8,
    /// Construct the engine with the pause gate closed.
    pub start_paused: bool,
    /// Buffered events per subscriber before it starts lagging.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_selector: 1,
            start_paused: false,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn default_selector(&self) -> Selector {
        Selector(self.default_selector)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(input).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.default_selector == 0 {
            return Err(EngineError::Config(
                "default_selector 0 is reserved for empty slots".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(EngineError::Config("event_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
