//! Annual financial records and the traits shared by every metric kind

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Display;

/// The three annual series the store keeps per ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Earnings,
    Income,
    BalanceSheet,
}

impl MetricKind {
    /// Name of the table (fjall partition) holding this series.
    pub fn table_name(&self) -> &'static str {
        match self {
            MetricKind::Earnings => "earnings",
            MetricKind::Income => "income_statements",
            MetricKind::BalanceSheet => "balance_sheets",
        }
    }
}

impl Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MetricKind::Earnings => "earnings",
                MetricKind::Income => "income statement",
                MetricKind::BalanceSheet => "balance sheet",
            }
        )
    }
}

/// A record that belongs to one ticker and one fiscal year.
pub trait AnnualRecord: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: MetricKind;

    fn ticker(&self) -> &str;
    fn fiscal_year(&self) -> i32;
}

/// An annual record carrying the single figure averaged by the P/E calculation.
pub trait AnnualMetric: AnnualRecord {
    fn metric_value(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsRecord {
    pub ticker: String,
    pub fiscal_year: i32,
    pub eps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub ticker: String,
    pub fiscal_year: i32,
    pub net_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetRecord {
    pub ticker: String,
    pub fiscal_year: i32,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_current_assets: f64,
    pub goodwill: f64,
    pub intangible_assets: f64,
}

impl AnnualRecord for EpsRecord {
    const KIND: MetricKind = MetricKind::Earnings;

    fn ticker(&self) -> &str {
        &self.ticker
    }

    fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }
}

impl AnnualMetric for EpsRecord {
    fn metric_value(&self) -> f64 {
        self.eps
    }
}

impl AnnualRecord for IncomeRecord {
    const KIND: MetricKind = MetricKind::Income;

    fn ticker(&self) -> &str {
        &self.ticker
    }

    fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }
}

impl AnnualMetric for IncomeRecord {
    fn metric_value(&self) -> f64 {
        self.net_income
    }
}

impl AnnualRecord for BalanceSheetRecord {
    const KIND: MetricKind = MetricKind::BalanceSheet;

    fn ticker(&self) -> &str {
        &self.ticker
    }

    fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }
}

/// Uppercases a ticker; every store and provider boundary keys on this form.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Sorts by fiscal year, newest first, keeping one record per year.
pub fn sort_descending<R: AnnualRecord>(records: &mut Vec<R>) {
    records.sort_by_key(|r| std::cmp::Reverse(r.fiscal_year()));
    records.dedup_by_key(|r| r.fiscal_year());
}
