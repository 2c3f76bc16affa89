use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Options controlling one transformation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Always emit a generic inbound trigger, ignoring the activation shape.
    pub callable: bool,
    /// Iteration cap for loops whose guard carries no numeric bound.
    pub default_loop_limit: u32,
    /// Upper bound accepted by the target loop primitive.
    pub max_loop_limit: u32,
    /// Retry cap of the loop synthesized for self-recursive calls.
    pub recursion_retry_limit: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            callable: false,
            default_loop_limit: 60,
            max_loop_limit: 5000,
            recursion_retry_limit: 10,
        }
    }
}

impl TransformOptions {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let options: TransformOptions =
            toml::from_str(toml_str).map_err(|e| ConfigError::TomlParseError(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Clamps a loop bound into `1..=max_loop_limit`.
    pub fn clamp_loop_limit(&self, limit: u32) -> u32 {
        limit.clamp(1, self.max_loop_limit.max(1))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loop_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_loop_limit",
                message: "must be at least 1".to_string(),
            });
        }
        if self.default_loop_limit == 0 || self.default_loop_limit > self.max_loop_limit {
            return Err(ConfigError::InvalidValue {
                name: "default_loop_limit",
                message: format!("must be between 1 and {}", self.max_loop_limit),
            });
        }
        if self.recursion_retry_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "recursion_retry_limit",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
