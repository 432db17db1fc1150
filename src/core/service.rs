//! Valuation queries: cached fundamentals combined with a current market value

use crate::core::fundamentals::{MarketValueChain, MarketValueKind};
use crate::core::records::{
    AnnualMetric, BalanceSheetRecord, EpsRecord, IncomeRecord, normalize_ticker,
};
use crate::core::refresh::SeriesRefresher;
use crate::core::valuation::{
    AssetValuation, PeValuation, YearPolicy, calculate_asset_valuation, seven_year_pe,
};
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeBasis {
    /// Share price over average EPS.
    Eps,
    /// Market cap over average net income.
    NetIncome,
}

impl PeBasis {
    fn market_value_kind(&self) -> MarketValueKind {
        match self {
            PeBasis::Eps => MarketValueKind::Price,
            PeBasis::NetIncome => MarketValueKind::MarketCap,
        }
    }
}

impl Display for PeBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PeBasis::Eps => "EPS",
                PeBasis::NetIncome => "Net income",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeReport {
    pub ticker: String,
    pub basis: PeBasis,
    pub market_value: f64,
    pub last_updated: String,
    pub valuation: PeValuation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetReport {
    pub ticker: String,
    pub market_cap: f64,
    pub last_updated: String,
    pub valuation: AssetValuation,
}

pub struct ValuationService {
    earnings: SeriesRefresher<EpsRecord>,
    income: SeriesRefresher<IncomeRecord>,
    balance_sheets: SeriesRefresher<BalanceSheetRecord>,
    market: MarketValueChain,
    year_policy: YearPolicy,
}

impl ValuationService {
    pub fn new(
        earnings: SeriesRefresher<EpsRecord>,
        income: SeriesRefresher<IncomeRecord>,
        balance_sheets: SeriesRefresher<BalanceSheetRecord>,
        market: MarketValueChain,
        year_policy: YearPolicy,
    ) -> Self {
        Self {
            earnings,
            income,
            balance_sheets,
            market,
            year_policy,
        }
    }

    /// Current market value of `ticker` from the provider chain, for callers that
    /// share one lookup across several queries.
    pub async fn market_value(&self, ticker: &str, kind: MarketValueKind) -> Option<f64> {
        self.market.fetch(&normalize_ticker(ticker), kind).await
    }

    async fn resolve_market_value(
        &self,
        ticker: &str,
        given: Option<f64>,
        kind: MarketValueKind,
    ) -> Option<f64> {
        match given {
            Some(value) => Some(value),
            None => {
                debug!("No {} supplied for {}, querying providers", kind, ticker);
                self.market.fetch(ticker, kind).await
            }
        }
    }

    async fn pe<R: AnnualMetric>(
        &self,
        refresher: &SeriesRefresher<R>,
        basis: PeBasis,
        ticker: &str,
        market_value: Option<f64>,
        freshness_signal: Option<&str>,
    ) -> Option<PeReport> {
        let ticker = normalize_ticker(ticker);
        let market_value = self
            .resolve_market_value(&ticker, market_value, basis.market_value_kind())
            .await?;
        let series = refresher.get_series(&ticker, freshness_signal).await?;
        let valuation = seven_year_pe(&series.records, market_value, self.year_policy)?;

        Some(PeReport {
            ticker,
            basis,
            market_value,
            last_updated: series.last_updated,
            valuation,
        })
    }

    /// 7-year average P/E from annual EPS and the share price.
    pub async fn eps_pe(
        &self,
        ticker: &str,
        price: Option<f64>,
        freshness_signal: Option<&str>,
    ) -> Option<PeReport> {
        self.pe(&self.earnings, PeBasis::Eps, ticker, price, freshness_signal)
            .await
    }

    /// 7-year average P/E from annual net income and the market cap.
    pub async fn income_pe(
        &self,
        ticker: &str,
        market_cap: Option<f64>,
        freshness_signal: Option<&str>,
    ) -> Option<PeReport> {
        self.pe(
            &self.income,
            PeBasis::NetIncome,
            ticker,
            market_cap,
            freshness_signal,
        )
        .await
    }

    /// NTA and NCAV multiples from the most recent balance sheet.
    pub async fn asset_valuation(
        &self,
        ticker: &str,
        market_cap: Option<f64>,
        freshness_signal: Option<&str>,
    ) -> Option<AssetReport> {
        let ticker = normalize_ticker(ticker);
        let market_cap = self
            .resolve_market_value(&ticker, market_cap, MarketValueKind::MarketCap)
            .await?;
        let series = self
            .balance_sheets
            .get_series(&ticker, freshness_signal)
            .await?;
        let latest = series.latest()?;

        Some(AssetReport {
            valuation: calculate_asset_valuation(latest, market_cap),
            ticker,
            market_cap,
            last_updated: series.last_updated,
        })
    }
}
