// src/periods.rs
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};

/// One competence month, the portal's AAAAMM time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("month {} out of range", month);
        }
        if !(1900..=9999).contains(&year) {
            bail!("year {} out of range", year);
        }
        Ok(Period { year, month })
    }

    /// The current UTC month.
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Period {
            year: today.year(),
            month: today.month(),
        }
    }

    /// AAAAMM query token, e.g. "201202".
    pub fn vcomp(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month, for the dim_period reference date.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated on construction")
    }

    fn next(self) -> Self {
        if self.month == 12 {
            Period {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Period {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every month from `from` to `to`, both inclusive.
    pub fn range_inclusive(from: Period, to: Period) -> Vec<Period> {
        let mut out = Vec::new();
        let mut cur = from;
        while cur <= to {
            out.push(cur);
            cur = cur.next();
        }
        out
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vcomp())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            bail!("expected AAAAMM, got {:?}", s);
        }
        let year: i32 = s[..4].parse().context("period year")?;
        let month: u32 = s[4..].parse().context("period month")?;
        Period::new(year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_round_trip() {
        let p: Period = "201202".parse().unwrap();
        assert_eq!(p.year(), 2012);
        assert_eq!(p.month(), 2);
        assert_eq!(p.vcomp(), "201202");
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!("2012".parse::<Period>().is_err());
        assert!("201213".parse::<Period>().is_err());
        assert!("201200".parse::<Period>().is_err());
        assert!("2012ab".parse::<Period>().is_err());
    }

    #[test]
    fn range_crosses_year_boundaries() {
        let from = Period::new(2012, 11).unwrap();
        let to = Period::new(2013, 2).unwrap();
        let range = Period::range_inclusive(from, to);
        let tokens: Vec<String> = range.iter().map(Period::vcomp).collect();
        assert_eq!(tokens, vec!["201211", "201212", "201301", "201302"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let from = Period::new(2013, 1).unwrap();
        let to = Period::new(2012, 1).unwrap();
        assert!(Period::range_inclusive(from, to).is_empty());
    }

    #[test]
    fn ordering_follows_time() {
        assert!(Period::new(2012, 12).unwrap() < Period::new(2013, 1).unwrap());
    }
}
