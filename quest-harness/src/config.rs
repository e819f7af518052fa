//! Harness configuration (`quest-test.toml`).
//!
//! ```toml
//! library = "./QuEST.so"
//! unit_path = "unitPath"
//! log_file = "QuESTLog.log"
//! tolerance = 1e-6
//! quiet = false
//!
//! [[function]]
//! name = "swapGate"
//! signature = "(Qureg, int, int) -> void"
//! defaults = ["0", "1"]
//!
//! [sets]
//! extras = ["swapGate"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalogue::{Catalogue, CatalogueSpec, FunctionSpec};
use crate::error::{HarnessError, Result};

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Settings for one harness session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Shared library exporting the QuEST API
    #[serde(default = "default_library")]
    pub library: PathBuf,

    /// Directory holding `<function>.test` files
    #[serde(default = "default_unit_path")]
    pub unit_path: PathBuf,

    /// Flat result log
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Suppress the `.`/`F` progress output
    #[serde(default)]
    pub quiet: bool,

    /// Start from the QuEST functions shipped with the harness
    #[serde(default = "default_true")]
    pub builtin_catalogue: bool,

    /// Extra functions to test
    #[serde(default, rename = "function")]
    pub functions: Vec<FunctionSpec>,

    /// Extra (or extended) test sets
    #[serde(default)]
    pub sets: BTreeMap<String, Vec<String>>,
}

fn default_library() -> PathBuf {
    PathBuf::from("./QuEST.so")
}

fn default_unit_path() -> PathBuf {
    PathBuf::from("unitPath")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("QuESTLog.log")
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_true() -> bool {
    true
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            library: default_library(),
            unit_path: default_unit_path(),
            log_file: default_log_file(),
            tolerance: default_tolerance(),
            quiet: false,
            builtin_catalogue: true,
            functions: Vec::new(),
            sets: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Parse a config from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(HarnessError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Builtin functions (unless disabled) merged with the configured ones.
    pub fn catalogue(&self) -> Result<Catalogue> {
        let mut catalogue = if self.builtin_catalogue {
            Catalogue::builtin()?
        } else {
            Catalogue::new()
        };
        catalogue.merge(&CatalogueSpec {
            functions: self.functions.clone(),
            sets: self.sets.clone(),
        })?;
        Ok(catalogue)
    }

    /// Path of the standard test file for `function`.
    pub fn test_path(&self, function: &str) -> PathBuf {
        self.unit_path.join(format!("{function}.test"))
    }
}
