use crate::core::currency::ExchangeRateSource;
use crate::providers::util::get_json;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// USD based rate table from an open.er-api.com compatible service.
pub struct OpenErApiSource {
    base_url: String,
    client: Client,
}

impl OpenErApiSource {
    pub fn new(base_url: &str, client: Client) -> Self {
        OpenErApiSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl ExchangeRateSource for OpenErApiSource {
    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_usd_rates(&self) -> Result<HashMap<String, f64>> {
        let url = Url::parse(&format!("{}/v6/latest/USD", self.base_url))?;
        let data: LatestRatesResponse = get_json(&self.client, url).await?;

        if data.result.as_deref() != Some("success") {
            return Err(anyhow!(
                "Exchange rate service returned result: {}",
                data.result.as_deref().unwrap_or("missing")
            ));
        }

        let rates = data
            .rates
            .filter(|rates| !rates.is_empty())
            .ok_or_else(|| anyhow!("Exchange rate service returned no rates"))?;
        debug!("Received {} exchange rates", rates.len());
        Ok(rates)
    }
}
