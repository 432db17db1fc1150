pub mod disk;
pub mod memory;
pub mod membership;

use crate::core::records::{BalanceSheetRecord, EpsRecord, IncomeRecord};
use anyhow::{Context, Result};
use disk::DiskSeriesStore;
use fjall::Keyspace;
use membership::ConstituentTable;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The on-disk database: one table per metric kind plus index memberships.
pub struct FundamentalsStore {
    pub earnings: Arc<DiskSeriesStore<EpsRecord>>,
    pub income: Arc<DiskSeriesStore<IncomeRecord>>,
    pub balance_sheets: Arc<DiskSeriesStore<BalanceSheetRecord>>,
    pub constituents: Arc<ConstituentTable>,
}

impl FundamentalsStore {
    /// Opens (creating if missing) the database under `data_path/cache`.
    pub fn open(data_path: &Path) -> Result<Self> {
        let cache_dir = data_path.join("cache");
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create directory: {}", cache_dir.display()))?;

        let keyspace = fjall::Config::new(&cache_dir)
            .open()
            .with_context(|| format!("Failed to open database at {}", cache_dir.display()))?;
        debug!("Opened database at {}", cache_dir.display());

        Self::from_keyspace(&keyspace)
    }

    pub fn from_keyspace(keyspace: &Keyspace) -> Result<Self> {
        Ok(Self {
            earnings: Arc::new(DiskSeriesStore::open(keyspace)?),
            income: Arc::new(DiskSeriesStore::open(keyspace)?),
            balance_sheets: Arc::new(DiskSeriesStore::open(keyspace)?),
            constituents: Arc::new(ConstituentTable::open(keyspace)?),
        })
    }
}
