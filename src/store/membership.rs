use crate::core::membership::{ConstituentRecord, IndexCode, IndexMembership, MembershipStore};
use crate::core::records::normalize_ticker;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::debug;

const TABLE_NAME: &str = "constituents";

/// Index membership table keyed by `(ticker, index, added date)`.
pub struct ConstituentTable {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl ConstituentTable {
    pub fn open(keyspace: &Keyspace) -> Result<Self> {
        let partition = keyspace
            .open_partition(TABLE_NAME, PartitionCreateOptions::default())
            .context("Failed to open constituents table")?;
        Ok(Self {
            keyspace: keyspace.clone(),
            partition,
        })
    }

    fn row_key(record: &ConstituentRecord) -> String {
        let added = record
            .added_date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
        format!(
            "{}/{}/{}",
            normalize_ticker(&record.ticker),
            record.index_code.code(),
            added
        )
    }

    fn rows(&self, prefix: &str) -> Result<Vec<ConstituentRecord>> {
        let mut records = Vec::new();
        for item in self.partition.prefix(prefix.to_string()) {
            let (_, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

impl MembershipStore for ConstituentTable {
    fn insert_constituent(&self, record: &ConstituentRecord) -> Result<bool> {
        let key = Self::row_key(record);
        if self.partition.contains_key(key.as_bytes())? {
            debug!("Constituent {} already stored", key);
            return Ok(false);
        }

        let mut record = record.clone();
        record.ticker = normalize_ticker(&record.ticker);
        self.partition
            .insert(key.as_bytes(), serde_json::to_vec(&record)?)
            .with_context(|| format!("Failed to insert constituent {key}"))?;
        Ok(true)
    }

    fn delete_index_data(&self, index: IndexCode) -> Result<usize> {
        let mut batch = self.keyspace.batch();
        let mut removed = 0;
        for item in self.partition.iter() {
            let (key, value) = item?;
            let record: ConstituentRecord = serde_json::from_slice(&value)?;
            if record.index_code == index {
                batch.remove(&self.partition, key);
                removed += 1;
            }
        }
        batch.commit()?;
        Ok(removed)
    }

    fn get_stock_memberships(&self, ticker: &str) -> Result<Vec<IndexMembership>> {
        let mut records = self.rows(&format!("{}/", normalize_ticker(ticker)))?;
        records.sort_by_key(|r| r.added_date);
        Ok(records.iter().map(IndexMembership::from).collect())
    }

    fn get_index_constituents(
        &self,
        index: IndexCode,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<String>> {
        let mut tickers: Vec<String> = self
            .rows("")?
            .into_iter()
            .filter(|r| r.index_code == index)
            .filter(|r| match as_of {
                None => r.removed_date.is_none(),
                Some(date) => {
                    r.added_date.is_some_and(|added| added <= date)
                        && r.removed_date.is_none_or(|removed| removed > date)
                }
            })
            .map(|r| r.ticker)
            .collect();
        tickers.sort();
        tickers.dedup();
        Ok(tickers)
    }
}
