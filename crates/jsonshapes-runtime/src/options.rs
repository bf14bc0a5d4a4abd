//! Operation options.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! unknown_keys = "collect"
//! max_depth = 64
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// What to do with object keys a shape does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    /// Report each unknown key as an error
    #[default]
    Reject,
    /// Accept unknown keys silently
    Ignore,
    /// Report each unknown key as a warning
    Collect,
}

impl UnknownKeys {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnknownKeys::Reject => "reject",
            UnknownKeys::Ignore => "ignore",
            UnknownKeys::Collect => "collect",
        }
    }
}

impl fmt::Display for UnknownKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnknownKeys {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(UnknownKeys::Reject),
            "ignore" => Ok(UnknownKeys::Ignore),
            "collect" => Ok(UnknownKeys::Collect),
            other => Err(format!(
                "unknown key policy must be \"reject\", \"ignore\" or \"collect\", got {other:?}"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Default policy for `object(...)` shapes without an explicit policy and
    /// for object literals used as shapes
    pub unknown_keys: UnknownKeys,
    /// Stop descending below this many path segments (reported as a violation)
    pub max_depth: Option<usize>,
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid options: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Options {
    pub fn with_unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(text)?)
    }

    /// Load options from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OptionsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
