//! Domain types: symbols, bars and per-symbol series.

pub mod bar;
pub mod series;
pub mod symbol;

pub use bar::Bar;
pub use series::{truncate_as_of, Series};
pub use symbol::Symbol;
