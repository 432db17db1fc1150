//! Index constituent records

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexCode {
    #[serde(rename = "sp500")]
    Sp500,
    #[serde(rename = "nasdaq100")]
    Nasdaq100,
}

impl IndexCode {
    pub fn code(&self) -> &'static str {
        match self {
            IndexCode::Sp500 => "sp500",
            IndexCode::Nasdaq100 => "nasdaq100",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IndexCode::Sp500 => "S&P 500",
            IndexCode::Nasdaq100 => "NASDAQ 100",
        }
    }
}

impl Display for IndexCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for IndexCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sp500" => Ok(IndexCode::Sp500),
            "nasdaq100" => Ok(IndexCode::Nasdaq100),
            _ => Err(anyhow!(
                "Invalid index: {}. Available indices: sp500, nasdaq100",
                s
            )),
        }
    }
}

/// One stint of a stock inside an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentRecord {
    pub ticker: String,
    pub index_code: IndexCode,
    pub added_date: Option<NaiveDate>,
    pub removed_date: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMembership {
    pub index_code: IndexCode,
    pub added_date: Option<NaiveDate>,
    pub removed_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

impl IndexMembership {
    pub fn index_name(&self) -> &'static str {
        self.index_code.display_name()
    }

    pub fn is_current(&self) -> bool {
        self.removed_date.is_none()
    }

    /// Years between joining and leaving the index (or `today` for current members).
    pub fn years_in_index(&self, today: NaiveDate) -> Option<f64> {
        let added = self.added_date?;
        let end = self.removed_date.unwrap_or(today);
        Some((end - added).num_days() as f64 / 365.25)
    }
}

impl From<&ConstituentRecord> for IndexMembership {
    fn from(record: &ConstituentRecord) -> Self {
        Self {
            index_code: record.index_code,
            added_date: record.added_date,
            removed_date: record.removed_date,
            reason: record.reason.clone(),
        }
    }
}

/// Persistence for index constituents. Rows are unique on `(ticker, index, added date)`.
pub trait MembershipStore: Send + Sync {
    /// Stores `record` unless an identical key exists. Returns whether it was added.
    fn insert_constituent(&self, record: &ConstituentRecord) -> anyhow::Result<bool>;

    /// Removes every row of `index`, returning how many were deleted.
    fn delete_index_data(&self, index: IndexCode) -> anyhow::Result<usize>;

    /// All memberships of `ticker`, ordered by added date.
    fn get_stock_memberships(&self, ticker: &str) -> anyhow::Result<Vec<IndexMembership>>;

    /// Tickers in `index`: current members, or the members on `as_of` when given.
    fn get_index_constituents(
        &self,
        index: IndexCode,
        as_of: Option<NaiveDate>,
    ) -> anyhow::Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_years_in_index_current() {
        let membership = IndexMembership {
            index_code: IndexCode::Sp500,
            added_date: Some(date(2020, 1, 1)),
            removed_date: None,
            reason: None,
        };

        let years = membership.years_in_index(date(2025, 1, 1)).unwrap();
        assert!((years - 5.0).abs() < 0.01);
        assert!(membership.is_current());
        assert_eq!(membership.index_name(), "S&P 500");
    }

    #[test]
    fn test_years_in_index_former() {
        let membership = IndexMembership {
            index_code: IndexCode::Nasdaq100,
            added_date: Some(date(2010, 1, 1)),
            removed_date: Some(date(2020, 1, 1)),
            reason: Some("Annual reconstitution".to_string()),
        };

        let years = membership.years_in_index(date(2030, 1, 1)).unwrap();
        assert!((years - 10.0).abs() < 0.1);
        assert!(!membership.is_current());
    }

    #[test]
    fn test_unknown_added_date_has_no_duration() {
        let membership = IndexMembership {
            index_code: IndexCode::Sp500,
            added_date: None,
            removed_date: None,
            reason: None,
        };
        assert!(membership.years_in_index(date(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_index_code_parsing() {
        assert_eq!("SP500".parse::<IndexCode>().unwrap(), IndexCode::Sp500);
        assert_eq!(
            "nasdaq100".parse::<IndexCode>().unwrap(),
            IndexCode::Nasdaq100
        );
        assert!("dow30".parse::<IndexCode>().is_err());
    }
}
