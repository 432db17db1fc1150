use crate::core::cache::{CachedSeries, SeriesStore};
use crate::core::records::{AnnualRecord, normalize_ticker, sort_descending};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory series store; contents are lost with the process.
pub struct MemorySeriesStore<R: AnnualRecord> {
    inner: Arc<Mutex<HashMap<String, CachedSeries<R>>>>,
}

impl<R: AnnualRecord> MemorySeriesStore<R> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<R: AnnualRecord> Default for MemorySeriesStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: AnnualRecord> SeriesStore<R> for MemorySeriesStore<R> {
    async fn save(&self, ticker: &str, records: &[R], as_of: &str) -> anyhow::Result<()> {
        let ticker = normalize_ticker(ticker);
        let mut records = records.to_vec();
        sort_descending(&mut records);

        let mut series = self.inner.lock().await;
        if records.is_empty() {
            series.remove(&ticker);
        } else {
            series.insert(
                ticker.clone(),
                CachedSeries {
                    ticker: ticker.clone(),
                    last_updated: as_of.to_string(),
                    records,
                },
            );
        }
        debug!("Cache PUT for {} {}", R::KIND, ticker);
        Ok(())
    }

    async fn get_cached(&self, ticker: &str) -> Option<CachedSeries<R>> {
        let ticker = normalize_ticker(ticker);
        let series = self.inner.lock().await;
        let cached = series.get(&ticker).cloned();
        if cached.is_some() {
            debug!("Cache HIT for {} {}", R::KIND, ticker);
        } else {
            debug!("Cache MISS for {} {}", R::KIND, ticker);
        }
        cached
    }
}
