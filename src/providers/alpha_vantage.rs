use crate::core::config::API_KEY_ENV;
use crate::core::currency::CurrencyConverter;
use crate::core::fundamentals::{FundamentalsProvider, MarketValueKind, MarketValueProvider};
use crate::core::records::{
    AnnualRecord, BalanceSheetRecord, EpsRecord, IncomeRecord, normalize_ticker, sort_descending,
};
use crate::providers::util::get_json;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::{Arc, Once};
use tracing::{debug, info, instrument, warn};

/// Top level keys Alpha Vantage uses instead of data when a call is rejected or throttled.
const ERROR_MARKERS: [&str; 3] = ["Error Message", "Note", "Information"];

pub struct AlphaVantageProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    converter: Arc<CurrencyConverter>,
    missing_key_warning: Once,
}

impl AlphaVantageProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        client: Client,
        converter: Arc<CurrencyConverter>,
    ) -> Self {
        AlphaVantageProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            converter,
            missing_key_warning: Once::new(),
        }
    }

    fn api_key(&self) -> Option<&str> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty());
        if key.is_none() {
            self.missing_key_warning.call_once(|| {
                warn!(
                    "No Alpha Vantage API key configured, set {} or providers.alpha_vantage.api_key",
                    API_KEY_ENV
                )
            });
        }
        key
    }

    async fn query<T: DeserializeOwned>(&self, function: &str, ticker: &str) -> Result<T> {
        let api_key = self
            .api_key()
            .ok_or_else(|| anyhow!("Alpha Vantage API key not configured"))?;
        let url = Url::parse_with_params(
            &format!("{}/query", self.base_url),
            &[("function", function), ("symbol", ticker), ("apikey", api_key)],
        )?;

        let data: Value = get_json(&self.client, url).await?;
        for marker in ERROR_MARKERS {
            if let Some(message) = data.get(marker) {
                return Err(anyhow!(
                    "Alpha Vantage {} for {} {}: {}",
                    marker,
                    function,
                    ticker,
                    message
                ));
            }
        }

        serde_json::from_value(data)
            .map_err(|e| anyhow!("Unexpected {} payload for {}: {}", function, ticker, e))
    }

    async fn fetch<T: DeserializeOwned>(&self, function: &str, ticker: &str) -> Option<T> {
        match self.query(function, ticker).await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(error = %e, "Alpha Vantage {} request failed for {}", function, ticker);
                None
            }
        }
    }

    async fn to_usd(&self, amount: f64, currency: &str, ticker: &str) -> Option<f64> {
        if currency == "USD" {
            return Some(amount);
        }
        let converted = self.converter.convert_to_usd(amount, currency).await;
        if converted.is_none() {
            warn!("Failed to convert {} figures from {} to USD", ticker, currency);
        }
        converted
    }
}

/// Reporting currency of a series, taken from its first entry. Defaults to USD.
fn reporting_currency(first: Option<&str>, ticker: &str) -> String {
    let currency = first
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "None")
        .map_or_else(|| "USD".to_string(), str::to_string);
    if currency != "USD" {
        info!("{} reports in {}, converting to USD", ticker, currency);
    }
    currency
}

/// Report fields arrive as strings, but some years carry bare numbers or other JSON.
/// Everything but `null` is kept as text so a bad value only drops its own year.
fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn parse_fiscal_year(fiscal_date_ending: Option<&str>) -> Option<i32> {
    fiscal_date_ending?.get(..4)?.parse().ok()
}

/// Required figure: missing, "None" or unparseable means the year is dropped.
fn parse_amount(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() || raw == "None" {
        return None;
    }
    raw.parse().ok()
}

/// Balance sheet figure: missing, "None" or empty reads as zero. Unparseable text is `None`.
fn parse_amount_or_zero(raw: Option<&str>) -> Option<f64> {
    match raw.map(str::trim) {
        None | Some("") | Some("None") => Some(0.0),
        Some(value) => value.parse().ok(),
    }
}

fn into_series<R: AnnualRecord>(mut records: Vec<R>) -> Option<Vec<R>> {
    if records.is_empty() {
        return None;
    }
    sort_descending(&mut records);
    Some(records)
}

#[derive(Debug, Deserialize)]
struct EarningsResponse {
    #[serde(rename = "annualEarnings", default)]
    annual_earnings: Vec<AnnualEarnings>,
}

#[derive(Debug, Deserialize)]
struct AnnualEarnings {
    #[serde(rename = "fiscalDateEnding", default, deserialize_with = "de_opt_text")]
    fiscal_date_ending: Option<String>,
    #[serde(rename = "reportedEPS", default, deserialize_with = "de_opt_text")]
    reported_eps: Option<String>,
    #[serde(rename = "reportedCurrency", default, deserialize_with = "de_opt_text")]
    reported_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnnualReportsResponse<T> {
    #[serde(rename = "annualReports", default = "Vec::new")]
    annual_reports: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct IncomeStatementReport {
    #[serde(rename = "fiscalDateEnding", default, deserialize_with = "de_opt_text")]
    fiscal_date_ending: Option<String>,
    #[serde(rename = "reportedCurrency", default, deserialize_with = "de_opt_text")]
    reported_currency: Option<String>,
    #[serde(rename = "netIncome", default, deserialize_with = "de_opt_text")]
    net_income: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceSheetReport {
    #[serde(rename = "fiscalDateEnding", default, deserialize_with = "de_opt_text")]
    fiscal_date_ending: Option<String>,
    #[serde(rename = "reportedCurrency", default, deserialize_with = "de_opt_text")]
    reported_currency: Option<String>,
    #[serde(rename = "totalAssets", default, deserialize_with = "de_opt_text")]
    total_assets: Option<String>,
    #[serde(rename = "totalLiabilities", default, deserialize_with = "de_opt_text")]
    total_liabilities: Option<String>,
    #[serde(rename = "totalCurrentAssets", default, deserialize_with = "de_opt_text")]
    total_current_assets: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    goodwill: Option<String>,
    #[serde(rename = "intangibleAssets", default, deserialize_with = "de_opt_text")]
    intangible_assets: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompanyOverview {
    #[serde(rename = "MarketCapitalization", default, deserialize_with = "de_opt_text")]
    market_capitalization: Option<String>,
    #[serde(rename = "Currency", default, deserialize_with = "de_opt_text")]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price", default, deserialize_with = "de_opt_text")]
    price: Option<String>,
}

#[async_trait]
impl FundamentalsProvider<EpsRecord> for AlphaVantageProvider {
    #[instrument(name = "AlphaVantageEarnings", skip(self))]
    async fn fetch_annual(&self, ticker: &str) -> Option<Vec<EpsRecord>> {
        let ticker = normalize_ticker(ticker);
        let data: EarningsResponse = self.fetch("EARNINGS", &ticker).await?;
        let currency = reporting_currency(
            data.annual_earnings
                .first()
                .and_then(|e| e.reported_currency.as_deref()),
            &ticker,
        );

        let mut records = Vec::with_capacity(data.annual_earnings.len());
        for entry in &data.annual_earnings {
            let (Some(fiscal_year), Some(eps)) = (
                parse_fiscal_year(entry.fiscal_date_ending.as_deref()),
                parse_amount(entry.reported_eps.as_deref()),
            ) else {
                continue;
            };
            records.push(EpsRecord {
                ticker: ticker.clone(),
                fiscal_year,
                eps: self.to_usd(eps, &currency, &ticker).await?,
            });
        }

        debug!("Parsed {} annual EPS records for {}", records.len(), ticker);
        into_series(records)
    }
}

#[async_trait]
impl FundamentalsProvider<IncomeRecord> for AlphaVantageProvider {
    #[instrument(name = "AlphaVantageIncome", skip(self))]
    async fn fetch_annual(&self, ticker: &str) -> Option<Vec<IncomeRecord>> {
        let ticker = normalize_ticker(ticker);
        let data: AnnualReportsResponse<IncomeStatementReport> =
            self.fetch("INCOME_STATEMENT", &ticker).await?;
        let currency = reporting_currency(
            data.annual_reports
                .first()
                .and_then(|r| r.reported_currency.as_deref()),
            &ticker,
        );

        let mut records = Vec::with_capacity(data.annual_reports.len());
        for report in &data.annual_reports {
            let (Some(fiscal_year), Some(net_income)) = (
                parse_fiscal_year(report.fiscal_date_ending.as_deref()),
                parse_amount(report.net_income.as_deref()),
            ) else {
                continue;
            };
            records.push(IncomeRecord {
                ticker: ticker.clone(),
                fiscal_year,
                net_income: self.to_usd(net_income, &currency, &ticker).await?,
            });
        }

        debug!("Parsed {} income statements for {}", records.len(), ticker);
        into_series(records)
    }
}

#[async_trait]
impl FundamentalsProvider<BalanceSheetRecord> for AlphaVantageProvider {
    #[instrument(name = "AlphaVantageBalanceSheet", skip(self))]
    async fn fetch_annual(&self, ticker: &str) -> Option<Vec<BalanceSheetRecord>> {
        let ticker = normalize_ticker(ticker);
        let data: AnnualReportsResponse<BalanceSheetReport> =
            self.fetch("BALANCE_SHEET", &ticker).await?;
        let currency = reporting_currency(
            data.annual_reports
                .first()
                .and_then(|r| r.reported_currency.as_deref()),
            &ticker,
        );

        let mut records = Vec::with_capacity(data.annual_reports.len());
        for report in &data.annual_reports {
            let (
                Some(fiscal_year),
                Some(total_assets),
                Some(total_liabilities),
                Some(total_current_assets),
            ) = (
                parse_fiscal_year(report.fiscal_date_ending.as_deref()),
                parse_amount_or_zero(report.total_assets.as_deref()),
                parse_amount_or_zero(report.total_liabilities.as_deref()),
                parse_amount_or_zero(report.total_current_assets.as_deref()),
            ) else {
                continue;
            };
            let goodwill = parse_amount_or_zero(report.goodwill.as_deref()).unwrap_or(0.0);
            let intangible_assets =
                parse_amount_or_zero(report.intangible_assets.as_deref()).unwrap_or(0.0);

            records.push(BalanceSheetRecord {
                ticker: ticker.clone(),
                fiscal_year,
                total_assets: self.to_usd(total_assets, &currency, &ticker).await?,
                total_liabilities: self.to_usd(total_liabilities, &currency, &ticker).await?,
                total_current_assets: self
                    .to_usd(total_current_assets, &currency, &ticker)
                    .await?,
                goodwill: self.to_usd(goodwill, &currency, &ticker).await?,
                intangible_assets: self.to_usd(intangible_assets, &currency, &ticker).await?,
            });
        }

        debug!("Parsed {} balance sheets for {}", records.len(), ticker);
        into_series(records)
    }
}

#[async_trait]
impl MarketValueProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    /// Market cap from OVERVIEW, in its listing currency converted to USD. Price from
    /// GLOBAL_QUOTE, which carries no currency and is taken as quoted.
    #[instrument(name = "AlphaVantageMarketValue", skip(self))]
    async fn fetch_market_value(&self, ticker: &str, kind: MarketValueKind) -> Option<f64> {
        let ticker = normalize_ticker(ticker);
        match kind {
            MarketValueKind::MarketCap => {
                let overview: CompanyOverview = self.fetch("OVERVIEW", &ticker).await?;
                let market_cap = parse_amount(overview.market_capitalization.as_deref())?;
                let currency = reporting_currency(overview.currency.as_deref(), &ticker);
                self.to_usd(market_cap, &currency, &ticker).await
            }
            MarketValueKind::Price => {
                let data: GlobalQuoteResponse = self.fetch("GLOBAL_QUOTE", &ticker).await?;
                parse_amount(data.quote?.price.as_deref())
            }
        }
    }
}
