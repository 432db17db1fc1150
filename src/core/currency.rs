//! Currency conversion to USD backed by a lazily refreshed rate table

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Source of a USD rate table: units of each currency per 1 USD.
#[async_trait]
pub trait ExchangeRateSource: Send + Sync {
    async fn fetch_usd_rates(&self) -> Result<HashMap<String, f64>>;
}

#[derive(Debug, Clone)]
pub struct ExchangeRateTable {
    pub rates: Arc<HashMap<String, f64>>,
    pub fetched_at: Instant,
}

impl ExchangeRateTable {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Holds at most one rate table and hands it out while it is younger than the TTL.
pub struct ExchangeRateCache {
    table: Mutex<Option<ExchangeRateTable>>,
    ttl: Duration,
}

impl ExchangeRateCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new() -> Self {
        Self::with_ttl(Self::DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            table: Mutex::new(None),
            ttl,
        }
    }

    /// Returns the cached rates unless absent or expired.
    pub async fn get(&self) -> Option<Arc<HashMap<String, f64>>> {
        let table = self.table.lock().await;
        match table.as_ref() {
            Some(t) if t.is_fresh(self.ttl) => {
                debug!("Exchange rate cache HIT");
                Some(Arc::clone(&t.rates))
            }
            Some(t) => {
                debug!(
                    age_secs = t.fetched_at.elapsed().as_secs(),
                    "Exchange rate cache expired"
                );
                None
            }
            None => {
                debug!("Exchange rate cache MISS");
                None
            }
        }
    }

    pub async fn put(&self, rates: HashMap<String, f64>) -> Arc<HashMap<String, f64>> {
        let rates = Arc::new(rates);
        let mut table = self.table.lock().await;
        *table = Some(ExchangeRateTable {
            rates: Arc::clone(&rates),
            fetched_at: Instant::now(),
        });
        debug!("Exchange rate cache PUT");
        rates
    }

    pub async fn invalidate(&self) {
        let mut table = self.table.lock().await;
        *table = None;
        debug!("Exchange rate cache CLEAR");
    }

    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_none()
    }
}

impl Default for ExchangeRateCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CurrencyConverter {
    source: Arc<dyn ExchangeRateSource>,
    cache: Arc<ExchangeRateCache>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn ExchangeRateSource>, cache: Arc<ExchangeRateCache>) -> Self {
        Self { source, cache }
    }

    /// Current USD rate table, fetched on a miss or once the cached one has expired.
    pub async fn get_rates(&self) -> Option<Arc<HashMap<String, f64>>> {
        if let Some(rates) = self.cache.get().await {
            return Some(rates);
        }

        match self.source.fetch_usd_rates().await {
            Ok(rates) => {
                debug!("Fetched exchange rates for {} currencies", rates.len());
                Some(self.cache.put(rates).await)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch exchange rates");
                self.cache.invalidate().await;
                None
            }
        }
    }

    /// Converts `amount` expressed in `from_currency` to USD.
    ///
    /// The code is matched exactly, so minor units such as `GBp` are unknown.
    /// Returns `None` when the table is unavailable, the currency is unknown or its
    /// rate is not strictly positive.
    pub async fn convert_to_usd(&self, amount: f64, from_currency: &str) -> Option<f64> {
        if from_currency == "USD" {
            return Some(amount);
        }

        let rates = self.get_rates().await?;
        let Some(rate) = rates.get(from_currency).copied() else {
            warn!("No exchange rate found for {}", from_currency);
            return None;
        };
        if rate <= 0.0 {
            warn!("Invalid exchange rate for {}: {}", from_currency, rate);
            return None;
        }

        // 1 USD = rate units of `from_currency`
        Some(amount / rate)
    }

    /// Drops the cached table so the next request fetches a new one.
    pub async fn clear(&self) {
        self.cache.invalidate().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::sleep;

    /// Serves a fixed table and counts fetches; can be switched to failing.
    pub(crate) struct StaticRates {
        rates: HashMap<String, f64>,
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
    }

    impl StaticRates {
        pub(crate) fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                rates: pairs.iter().map(|(c, r)| (c.to_string(), *r)).collect(),
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ExchangeRateSource for StaticRates {
        async fn fetch_usd_rates(&self) -> Result<HashMap<String, f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(anyhow!("rate service unavailable"));
            }
            Ok(self.rates.clone())
        }
    }

    pub(crate) fn converter_with(source: Arc<StaticRates>) -> CurrencyConverter {
        CurrencyConverter::new(source, Arc::new(ExchangeRateCache::new()))
    }

    fn sample_source() -> Arc<StaticRates> {
        Arc::new(StaticRates::new(&[
            ("USD", 1.0),
            ("EUR", 0.8),
            ("DKK", 6.5),
            ("BAD", 0.0),
        ]))
    }

    #[tokio::test]
    async fn test_usd_is_identity_without_fetch() {
        let source = sample_source();
        let converter = converter_with(Arc::clone(&source));

        assert_eq!(converter.convert_to_usd(1234.5, "USD").await, Some(1234.5));
        assert_eq!(converter.convert_to_usd(-7.0, "USD").await, Some(-7.0));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_convert_divides_by_rate() {
        let converter = converter_with(sample_source());

        let eur = converter.convert_to_usd(1000.0, "EUR").await.unwrap();
        assert!((eur - 1250.0).abs() < 1e-9);

        let dkk = converter.convert_to_usd(650.0, "DKK").await.unwrap();
        assert!((dkk - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_or_non_positive_rate_is_none() {
        let converter = converter_with(sample_source());

        assert!(converter.convert_to_usd(1000.0, "INVALID").await.is_none());
        assert!(converter.convert_to_usd(1000.0, "BAD").await.is_none());
    }

    #[tokio::test]
    async fn test_currency_code_is_matched_exactly() {
        let converter = converter_with(Arc::new(StaticRates::new(&[
            ("USD", 1.0),
            ("GBP", 0.8),
        ])));

        assert!(converter.convert_to_usd(100.0, "GBp").await.is_none());
        assert!(converter.convert_to_usd(100.0, "gbp").await.is_none());
        assert_eq!(converter.convert_to_usd(100.0, "GBP").await, Some(125.0));
    }

    #[tokio::test]
    async fn test_rates_are_cached() {
        let source = sample_source();
        let converter = converter_with(Arc::clone(&source));

        let first = converter.get_rates().await.unwrap();
        let second = converter.get_rates().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let source = sample_source();
        let cache = Arc::new(ExchangeRateCache::new());
        let converter = CurrencyConverter::new(source.clone(), Arc::clone(&cache));

        assert!(cache.is_empty().await);
        converter.get_rates().await.unwrap();
        assert!(!cache.is_empty().await);

        converter.clear().await;
        assert!(cache.is_empty().await);

        converter.get_rates().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_table_is_refetched() {
        let source = sample_source();
        let cache = Arc::new(ExchangeRateCache::with_ttl(Duration::from_millis(10)));
        let converter = CurrencyConverter::new(source.clone(), cache);

        converter.get_rates().await.unwrap();
        sleep(Duration::from_millis(20)).await;
        converter.get_rates().await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_after_expiry_yields_none() {
        let source = sample_source();
        let cache = Arc::new(ExchangeRateCache::with_ttl(Duration::from_millis(10)));
        let converter = CurrencyConverter::new(source.clone(), Arc::clone(&cache));

        assert!(converter.convert_to_usd(80.0, "EUR").await.is_some());

        sleep(Duration::from_millis(20)).await;
        source.failing.store(true, Ordering::SeqCst);

        assert!(converter.convert_to_usd(80.0, "EUR").await.is_none());
        assert!(cache.is_empty().await);

        source.failing.store(false, Ordering::SeqCst);
        assert!(converter.convert_to_usd(80.0, "EUR").await.is_some());
    }
}
