use crate::core::cache::{CachedSeries, SeriesStore};
use crate::core::records::{AnnualRecord, normalize_ticker};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::marker::PhantomData;
use tracing::{debug, warn};

#[derive(Serialize, Deserialize)]
struct StoredRow<R> {
    last_updated: String,
    record: R,
}

/// Series store persisted in one fjall partition per metric kind.
///
/// Rows are keyed `TICKER/YEAR`, so each ticker owns a contiguous key prefix and at most
/// one row per fiscal year.
pub struct DiskSeriesStore<R: AnnualRecord> {
    keyspace: Keyspace,
    partition: PartitionHandle,
    _marker: PhantomData<R>,
}

impl<R: AnnualRecord> DiskSeriesStore<R> {
    pub fn open(keyspace: &Keyspace) -> Result<Self> {
        let name = R::KIND.table_name();
        let partition = keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open {name} table"))?;

        Ok(Self {
            keyspace: keyspace.clone(),
            partition,
            _marker: PhantomData,
        })
    }

    fn ticker_prefix(ticker: &str) -> String {
        format!("{ticker}/")
    }

    fn row_key(ticker: &str, fiscal_year: i32) -> String {
        format!("{ticker}/{fiscal_year:04}")
    }

    fn replace(&self, ticker: &str, records: &[R], as_of: &str) -> Result<()> {
        let mut batch = self.keyspace.batch();

        for item in self.partition.prefix(Self::ticker_prefix(ticker)) {
            let (key, _) = item?;
            batch.remove(&self.partition, key);
        }

        for record in records {
            let row = StoredRow {
                last_updated: as_of.to_string(),
                record: record.clone(),
            };
            batch.insert(
                &self.partition,
                Self::row_key(ticker, record.fiscal_year()).as_bytes(),
                serde_json::to_vec(&row)?,
            );
        }

        batch
            .commit()
            .with_context(|| format!("Failed to commit {} for {}", R::KIND, ticker))?;
        Ok(())
    }

    fn read(&self, ticker: &str) -> Result<Option<CachedSeries<R>>> {
        let mut rows = Vec::new();
        for item in self.partition.prefix(Self::ticker_prefix(ticker)) {
            let (_, value) = item?;
            let row: StoredRow<R> = serde_json::from_slice(&value)?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Ok(None);
        }
        rows.sort_by_key(|row| Reverse(row.record.fiscal_year()));

        let last_updated = rows[0].last_updated.clone();
        Ok(Some(CachedSeries {
            ticker: ticker.to_string(),
            last_updated,
            records: rows.into_iter().map(|row| row.record).collect(),
        }))
    }
}

#[async_trait]
impl<R: AnnualRecord> SeriesStore<R> for DiskSeriesStore<R> {
    async fn save(&self, ticker: &str, records: &[R], as_of: &str) -> Result<()> {
        let ticker = normalize_ticker(ticker);
        self.replace(&ticker, records, as_of)?;
        debug!("Cache PUT for {} {}", R::KIND, ticker);
        Ok(())
    }

    async fn get_cached(&self, ticker: &str) -> Option<CachedSeries<R>> {
        let ticker = normalize_ticker(ticker);
        match self.read(&ticker) {
            Ok(Some(series)) => {
                debug!("Cache HIT for {} {}", R::KIND, ticker);
                Some(series)
            }
            Ok(None) => {
                debug!("Cache MISS for {} {}", R::KIND, ticker);
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read {} for {}", R::KIND, ticker);
                None
            }
        }
    }
}
