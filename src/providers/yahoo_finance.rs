use crate::core::currency::CurrencyConverter;
use crate::core::fundamentals::{MarketValueKind, MarketValueProvider};
use crate::core::records::normalize_ticker;
use crate::providers::util::get_json;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Secondary market value source backed by the Yahoo Finance quote endpoint.
pub struct YahooFinanceProvider {
    base_url: String,
    client: Client,
    converter: Arc<CurrencyConverter>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, client: Client, converter: Arc<CurrencyConverter>) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            converter,
        }
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteItem> {
        let url = Url::parse_with_params(
            &format!("{}/v7/finance/quote", self.base_url),
            &[("symbols", symbol)],
        )?;
        let data: YahooQuoteResponse = get_json(&self.client, url).await?;

        data.quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No quote data found for symbol: {}", symbol))
    }
}

#[derive(Deserialize, Debug)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResult,
}

#[derive(Deserialize, Debug)]
struct QuoteResult {
    #[serde(default)]
    result: Vec<QuoteItem>,
}

#[derive(Deserialize, Debug)]
struct QuoteItem {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "marketCap")]
    market_cap: Option<f64>,
    currency: Option<String>,
}

#[async_trait]
impl MarketValueProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    #[instrument(
        name = "YahooQuoteFetch",
        skip(self),
        fields(symbol = %ticker)
    )]
    async fn fetch_market_value(&self, ticker: &str, kind: MarketValueKind) -> Option<f64> {
        let symbol = normalize_ticker(ticker);
        let item = match self.fetch_quote(&symbol).await {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "Yahoo quote request failed");
                return None;
            }
        };
        debug!(quote = ?item, "Received Yahoo quote");

        let value = match kind {
            MarketValueKind::Price => item.regular_market_price,
            MarketValueKind::MarketCap => item.market_cap,
        }?;
        let currency = item.currency.as_deref().unwrap_or("USD");
        self.converter.convert_to_usd(value, currency).await
    }
}
