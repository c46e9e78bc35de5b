//! `.env` file support
//!
//! Deployments drop a `.env` next to the binary instead of exporting
//! variables in a service unit. Values found here never override variables
//! that are already set in the process environment, so the file is read
//! into a map instead of being loaded into the environment.

use crate::error::ConfigError;
use log::{debug, warn};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Variables loaded from a dotenv file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DotEnv {
    vars: HashMap<String, String>,
}

impl DotEnv {
    /// Load `path` if it exists; a missing file yields an empty set
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No dotenv file at {}", path.display());
            return Ok(Self::default());
        }

        let source = path.display().to_string();
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", source, e)))?;
        let parsed = Self::collect(iter, &source)?;
        debug!("Loaded {} variables from {}", parsed.vars.len(), source);
        Ok(parsed)
    }

    /// Parse dotenv text
    ///
    /// Follows the usual dotenv syntax: `#` comments, optional `export`,
    /// single or double quoting and `$VAR` substitution. Malformed lines are
    /// skipped with a warning. Later duplicates do not replace earlier ones.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Self::collect(dotenvy::from_read_iter(contents.as_bytes()), "dotenv text")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn collect<R: Read>(iter: dotenvy::Iter<R>, source: &str) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();

        for item in iter {
            match item {
                Ok((key, value)) => {
                    vars.entry(key).or_insert(value);
                }
                Err(dotenvy::Error::LineParse(line, index)) => {
                    warn!(
                        "Skipping malformed line in {} at column {}: {}",
                        source, index, line
                    );
                }
                Err(e) => return Err(ConfigError::ReadError(format!("{}: {}", source, e))),
            }
        }

        Ok(Self { vars })
    }
}
