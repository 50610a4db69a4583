//! Offline fetch client: one CSV file per symbol in a directory.
//!
//! Layout: `<dir>/<code>.csv` with header `date,open,high,low,close,volume`
//! and ISO dates. A missing file means "no data"; an unreadable or malformed
//! file is a fetch failure like any network error.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::provider::{DataError, DataProvider, RawBar};
use crate::domain::Symbol;

#[derive(Debug, Clone)]
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, code: &str) -> PathBuf {
        self.dir.join(format!("{code}.csv"))
    }

    fn read(path: &Path) -> Result<Vec<RawBar>, DataError> {
        let csv_err = |e: csv::Error| DataError::Csv {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
        reader
            .deserialize::<RawBar>()
            .map(|row| row.map_err(csv_err))
            .collect()
    }
}

impl DataProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv_dir"
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let path = self.path_for(&symbol.code);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                code: symbol.code.clone(),
            });
        }
        let mut bars = Self::read(&path)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }
}

/// Write bars in the layout `CsvDirProvider` reads.
pub fn write_csv(path: &Path, bars: &[RawBar]) -> Result<(), DataError> {
    let csv_err = |e: csv::Error| DataError::Csv {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for bar in bars {
        writer.serialize(bar).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}
