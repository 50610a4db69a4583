//! Symbol identity: exchange code plus display name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An equity symbol in the screening universe.
///
/// Identity is the `(code, name)` pair; the universe may change daily but a
/// `Symbol` value never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub code: String,
    pub name: String,
}

impl Symbol {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}({})", self.name, self.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_name_and_code() {
        let s = Symbol::new("600519", "Kweichow Moutai");
        assert_eq!(s.to_string(), "Kweichow Moutai(600519)");
    }

    #[test]
    fn display_without_name_is_code() {
        assert_eq!(Symbol::new("SPY", "").to_string(), "SPY");
    }
}
