//! Staleness driven refresh of cached annual series

use crate::core::cache::{CachedSeries, SeriesStore};
use crate::core::fundamentals::FundamentalsProvider;
use crate::core::records::{AnnualRecord, normalize_ticker};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Whether a cached series must be refetched.
///
/// True when nothing is cached, or when `freshness_signal` is a later ISO date than the
/// cache's `last_updated`. Dates compare as plain strings.
pub fn needs_refresh<R>(cached: Option<&CachedSeries<R>>, freshness_signal: Option<&str>) -> bool {
    match (cached, freshness_signal) {
        (None, _) => true,
        (Some(series), Some(signal)) => signal > series.last_updated.as_str(),
        (Some(_), None) => false,
    }
}

/// Serves one metric kind from the store, refreshing it from the provider when stale.
pub struct SeriesRefresher<R: AnnualRecord> {
    store: Arc<dyn SeriesStore<R>>,
    provider: Arc<dyn FundamentalsProvider<R>>,
    today: Clock,
}

impl<R: AnnualRecord> SeriesRefresher<R> {
    pub fn new(store: Arc<dyn SeriesStore<R>>, provider: Arc<dyn FundamentalsProvider<R>>) -> Self {
        Self::with_clock(store, provider, Arc::new(|| Local::now().date_naive()))
    }

    pub fn with_clock(
        store: Arc<dyn SeriesStore<R>>,
        provider: Arc<dyn FundamentalsProvider<R>>,
        today: Clock,
    ) -> Self {
        Self {
            store,
            provider,
            today,
        }
    }

    #[instrument(
        name = "SeriesRefresh",
        skip(self),
        fields(kind = %R::KIND)
    )]
    pub async fn get_series(
        &self,
        ticker: &str,
        freshness_signal: Option<&str>,
    ) -> Option<CachedSeries<R>> {
        let ticker = normalize_ticker(ticker);
        let cached = self.store.get_cached(&ticker).await;

        if !needs_refresh(cached.as_ref(), freshness_signal) {
            debug!("Using cached {} for {}", R::KIND, ticker);
            return cached;
        }

        let Some(records) = self.provider.fetch_annual(&ticker).await else {
            debug!("Refresh of {} for {} failed, keeping cache", R::KIND, ticker);
            return cached;
        };

        let today = (self.today)().format("%Y-%m-%d").to_string();
        if let Err(e) = self.store.save(&ticker, &records, &today).await {
            warn!(error = %e, "Failed to save {} for {}", R::KIND, ticker);
            return cached;
        }
        info!(
            "Refreshed {} for {} with {} fiscal years",
            R::KIND,
            ticker,
            records.len()
        );

        self.store.get_cached(&ticker).await
    }
}
