//! Market breadth - how many names moved hard on the latest session.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sequoia_core::domain::truncate_as_of;
use sequoia_core::Series;

/// Daily move that counts as limit up / limit down, in percent.
pub const LIMIT_PCT: f64 = 9.5;
pub const BIG_MOVE_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketBreadth {
    pub limit_up: usize,
    pub limit_down: usize,
    pub up_5: usize,
    pub down_5: usize,
}

impl MarketBreadth {
    /// Count over the last bar of every series visible on `as_of`.
    pub fn compute<'a>(series: impl IntoIterator<Item = &'a Series>, as_of: Option<NaiveDate>) -> Self {
        let mut b = Self::default();
        for s in series {
            let Some(last) = truncate_as_of(s.bars(), as_of).last() else {
                continue;
            };
            let pct = last.pct_change;
            if pct >= LIMIT_PCT {
                b.limit_up += 1;
            }
            if pct <= -LIMIT_PCT {
                b.limit_down += 1;
            }
            if pct >= BIG_MOVE_PCT {
                b.up_5 += 1;
            }
            if pct <= -BIG_MOVE_PCT {
                b.down_5 += 1;
            }
        }
        b
    }
}

impl fmt::Display for MarketBreadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "limit up: {}   limit down: {}", self.limit_up, self.limit_down)?;
        write!(f, "up over 5%: {}  down over 5%: {}", self.up_5, self.down_5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequoia_core::{Bar, Symbol};

    fn one_day(code: &str, pct_change: f64) -> Series {
        let bar = Bar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 1.0,
            pct_change,
        };
        Series::new(Symbol::new(code, ""), vec![bar])
    }

    #[test]
    fn limit_moves_also_count_as_big_moves() {
        let all = [
            one_day("a", 10.0),
            one_day("b", 9.5),
            one_day("c", 6.0),
            one_day("d", -9.9),
            one_day("e", -5.0),
            one_day("f", 0.3),
            one_day("g", f64::NAN),
        ];
        let b = MarketBreadth::compute(&all, None);
        assert_eq!(
            b,
            MarketBreadth {
                limit_up: 2,
                limit_down: 1,
                up_5: 3,
                down_5: 2,
            }
        );
        assert_eq!(
            b.to_string(),
            "limit up: 2   limit down: 1\nup over 5%: 3  down over 5%: 2"
        );
    }

    #[test]
    fn series_unlisted_on_as_of_are_ignored() {
        let all = [one_day("a", 10.0)];
        let b = MarketBreadth::compute(&all, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(b, MarketBreadth::default());
    }
}
