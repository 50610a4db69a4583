//! Universe files - the ordered symbol list for a run.
//!
//! Two formats, picked by extension:
//! - TOML: `[[symbols]]` tables with `code` and `name`
//! - CSV: header `code,name`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::provider::{DataError, UniverseProvider};
use crate::domain::Symbol;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

impl Universe {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    /// Load a universe, choosing the parser from the file extension.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            Self::from_csv_path(path)
        } else {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        }
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        toml::from_str(content).map_err(|e| DataError::Other(format!("parse universe TOML: {e}")))
    }

    fn from_csv_path(path: &Path) -> Result<Self, DataError> {
        let csv_err = |e: csv::Error| DataError::Csv {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
        let symbols = reader
            .deserialize::<Symbol>()
            .map(|row| row.map_err(csv_err))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { symbols })
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self)
            .map_err(|e| DataError::Other(format!("serialize universe: {e}")))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl UniverseProvider for Universe {
    fn symbols(&self) -> Result<Vec<Symbol>, DataError> {
        Ok(self.symbols.clone())
    }
}

/// Universe read from disk at run time, so a daily loop picks up edits.
#[derive(Debug, Clone)]
pub struct UniverseFile {
    path: PathBuf,
}

impl UniverseFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UniverseProvider for UniverseFile {
    fn symbols(&self) -> Result<Vec<Symbol>, DataError> {
        Universe::from_file(&self.path).map(|u| u.symbols)
    }
}
