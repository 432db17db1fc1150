//! Cached annual series and the storage abstraction behind them

use crate::core::records::AnnualRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Every stored record of one ticker and metric kind.
///
/// `records` are ordered by fiscal year, newest first. `last_updated` is an ISO date
/// (`YYYY-MM-DD`) shared by the whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSeries<R> {
    pub ticker: String,
    pub last_updated: String,
    pub records: Vec<R>,
}

impl<R> CachedSeries<R> {
    pub fn latest(&self) -> Option<&R> {
        self.records.first()
    }
}

/// Keyed storage of one metric kind's annual series.
///
/// Implementations uppercase tickers on the way in and out.
#[async_trait]
pub trait SeriesStore<R: AnnualRecord>: Send + Sync {
    /// Replaces every record held for `ticker` with `records`, stamped with `as_of`.
    ///
    /// Partial writes must never be observable.
    async fn save(&self, ticker: &str, records: &[R], as_of: &str) -> anyhow::Result<()>;

    /// Returns the series for `ticker`, or `None` when nothing is stored.
    async fn get_cached(&self, ticker: &str) -> Option<CachedSeries<R>>;
}
