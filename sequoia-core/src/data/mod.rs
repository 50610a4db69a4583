//! Data acquisition: fetch clients, universe files, preprocessing and the
//! concurrent fetch orchestrator.

pub mod circuit_breaker;
pub mod csv_dir;
pub mod fetch;
pub mod ingest;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_dir::{write_csv, CsvDirProvider};
pub use fetch::{
    fetch_universe, FetchOptions, FetchOutcome, FetchProgress, FetchSummary, LogProgress,
    NoProgress, DEFAULT_WORKERS,
};
pub use ingest::preprocess;
pub use provider::{DataError, DataProvider, RawBar, UniverseProvider};
pub use universe::{Universe, UniverseFile};
pub use yahoo::YahooProvider;
