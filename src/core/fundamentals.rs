//! Provider abstractions for annual fundamentals, market values and filing dates

use crate::core::records::AnnualRecord;
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

/// Fetches a ticker's annual series from an external source.
///
/// Implementations return records sorted by fiscal year descending and never an
/// empty `Some`.
#[async_trait]
pub trait FundamentalsProvider<R: AnnualRecord>: Send + Sync {
    async fn fetch_annual(&self, ticker: &str) -> Option<Vec<R>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketValueKind {
    /// Latest share price in USD.
    Price,
    /// Market capitalization in USD.
    MarketCap,
}

impl Display for MarketValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MarketValueKind::Price => "price",
                MarketValueKind::MarketCap => "market cap",
            }
        )
    }
}

#[async_trait]
pub trait MarketValueProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_market_value(&self, ticker: &str, kind: MarketValueKind) -> Option<f64>;
}

/// Supplies the date (ISO `YYYY-MM-DD`) of a ticker's most recent annual filing.
#[async_trait]
pub trait FilingDateProvider: Send + Sync {
    async fn latest_annual_filing_date(&self, ticker: &str) -> Option<String>;
}

/// Market value sources tried in order; the first positive value wins.
#[derive(Clone, Default)]
pub struct MarketValueChain {
    providers: Vec<Arc<dyn MarketValueProvider>>,
}

impl MarketValueChain {
    pub fn new(providers: Vec<Arc<dyn MarketValueProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn fetch(&self, ticker: &str, kind: MarketValueKind) -> Option<f64> {
        for provider in &self.providers {
            match provider.fetch_market_value(ticker, kind).await {
                Some(value) if value > 0.0 => {
                    debug!(provider = provider.name(), %kind, value, "Market value resolved");
                    return Some(value);
                }
                _ => debug!(provider = provider.name(), %kind, "No usable market value"),
            }
        }
        None
    }
}
