//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod fundamentals;
pub mod log;
pub mod membership;
pub mod records;
pub mod refresh;
pub mod service;
pub mod valuation;

// Re-export main types for cleaner imports
pub use cache::{CachedSeries, SeriesStore};
pub use currency::{CurrencyConverter, ExchangeRateCache, ExchangeRateSource};
pub use fundamentals::{
    FilingDateProvider, FundamentalsProvider, MarketValueChain, MarketValueKind,
    MarketValueProvider,
};
pub use membership::{IndexCode, IndexMembership, MembershipStore};
pub use records::{BalanceSheetRecord, EpsRecord, IncomeRecord, MetricKind};
pub use refresh::SeriesRefresher;
pub use service::{AssetReport, PeBasis, PeReport, ValuationService};
pub use valuation::{AssetValuation, PeValuation, YearPolicy, format_currency};
