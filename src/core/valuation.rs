//! Valuation ratios computed from annual series and a current market value

use crate::core::records::{AnnualMetric, BalanceSheetRecord};

/// Number of fiscal years averaged by the P/E calculation.
pub const PE_YEARS: usize = 7;

/// Which fiscal years may feed a multi-year average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearPolicy {
    /// The latest years must follow each other without gaps.
    #[default]
    Consecutive,
    /// The latest records are used as they come.
    Latest,
}

impl YearPolicy {
    pub fn from_flag(require_consecutive: bool) -> Self {
        if require_consecutive {
            YearPolicy::Consecutive
        } else {
            YearPolicy::Latest
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeValuation {
    pub pe: f64,
    /// Average of the metric over the years used.
    pub average: f64,
    pub first_year: i32,
    pub last_year: i32,
}

/// Market value divided by the 7-year average of `records`.
///
/// `records` must already be ordered newest first. `None` when fewer than seven
/// years exist, the policy rejects the years, or the average is not positive.
pub fn seven_year_pe<R: AnnualMetric>(
    records: &[R],
    market_value: f64,
    policy: YearPolicy,
) -> Option<PeValuation> {
    if records.len() < PE_YEARS {
        return None;
    }
    let window = &records[..PE_YEARS];

    if policy == YearPolicy::Consecutive
        && !window
            .windows(2)
            .all(|pair| pair[0].fiscal_year() - pair[1].fiscal_year() == 1)
    {
        return None;
    }

    let average = window.iter().map(|r| r.metric_value()).sum::<f64>() / PE_YEARS as f64;
    if average <= 0.0 {
        return None;
    }

    Some(PeValuation {
        pe: market_value / average,
        average,
        first_year: window[PE_YEARS - 1].fiscal_year(),
        last_year: window[0].fiscal_year(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetValuation {
    pub fiscal_year: i32,
    /// Net tangible assets; may be negative.
    pub nta: f64,
    /// Net current asset value; may be negative.
    pub ncav: f64,
    pub p_nta: Option<f64>,
    pub p_ncav: Option<f64>,
}

pub fn calculate_asset_valuation(record: &BalanceSheetRecord, market_cap: f64) -> AssetValuation {
    let nta = record.total_assets
        - record.total_liabilities
        - record.goodwill
        - record.intangible_assets;
    let ncav = record.total_current_assets - record.total_liabilities;

    AssetValuation {
        fiscal_year: record.fiscal_year,
        nta,
        ncav,
        p_nta: (nta > 0.0).then(|| market_cap / nta),
        p_ncav: (ncav > 0.0).then(|| market_cap / ncav),
    }
}

/// Renders a dollar amount as `$12.5B`, `-$500.0M`, `$12.3K` or `$5000`.
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let abs = amount.abs();

    let body = if abs >= 1e9 {
        format!("{:.1}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", abs / 1e6)
    } else if abs >= 1e4 {
        format!("{:.1}K", abs / 1e3)
    } else {
        format!("{abs:.0}")
    };

    format!("{sign}${body}")
}
