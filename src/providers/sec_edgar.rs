use crate::core::fundamentals::FilingDateProvider;
use crate::core::records::normalize_ticker;
use crate::providers::util::get_json;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

const ANNUAL_REPORT_FORM: &str = "10-K";

/// Latest annual filing dates from SEC EDGAR.
///
/// The client must carry a user agent with contact details, EDGAR rejects anonymous requests.
pub struct SecEdgarProvider {
    base_url: String,
    data_url: String,
    client: Client,
    ciks: OnceCell<HashMap<String, u64>>,
}

#[derive(Debug, Deserialize)]
struct CompanyTicker {
    cik_str: u64,
    ticker: String,
}

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: Filings,
}

#[derive(Debug, Deserialize)]
struct Filings {
    recent: RecentFilings,
}

#[derive(Debug, Deserialize)]
struct RecentFilings {
    #[serde(default)]
    form: Vec<String>,
    #[serde(rename = "filingDate", default)]
    filing_date: Vec<String>,
}

impl SecEdgarProvider {
    pub fn new(base_url: &str, data_url: &str, client: Client) -> Self {
        SecEdgarProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
            client,
            ciks: OnceCell::new(),
        }
    }

    async fn load_ciks(&self) -> Result<HashMap<String, u64>> {
        let url = Url::parse(&format!("{}/files/company_tickers.json", self.base_url))?;
        let data: HashMap<String, CompanyTicker> = get_json(&self.client, url).await?;
        debug!("Loaded {} EDGAR tickers", data.len());

        Ok(data
            .into_values()
            .map(|entry| (normalize_ticker(&entry.ticker), entry.cik_str))
            .collect())
    }

    /// CIK of `ticker`, `None` when EDGAR does not list it.
    pub async fn cik_for(&self, ticker: &str) -> Result<Option<u64>> {
        let ciks = self.ciks.get_or_try_init(|| self.load_ciks()).await?;
        Ok(ciks.get(&normalize_ticker(ticker)).copied())
    }

    async fn latest_filing(&self, ticker: &str) -> Result<Option<String>> {
        let Some(cik) = self.cik_for(ticker).await? else {
            debug!("{} not listed on EDGAR", ticker);
            return Ok(None);
        };

        let url = Url::parse(&format!(
            "{}/submissions/CIK{:0>10}.json",
            self.data_url, cik
        ))?;
        let submissions: Submissions = get_json(&self.client, url).await?;
        let recent = submissions.filings.recent;
        if recent.form.len() != recent.filing_date.len() {
            return Err(anyhow!("Mismatched filing columns for CIK {}", cik));
        }

        Ok(recent
            .form
            .iter()
            .zip(&recent.filing_date)
            .filter(|(form, _)| form.as_str() == ANNUAL_REPORT_FORM)
            .map(|(_, date)| date)
            .max()
            .cloned())
    }
}

#[async_trait]
impl FilingDateProvider for SecEdgarProvider {
    #[instrument(name = "SecEdgarFilingDate", skip(self))]
    async fn latest_annual_filing_date(&self, ticker: &str) -> Option<String> {
        match self.latest_filing(ticker).await {
            Ok(date) => {
                debug!(?date, "Latest {} for {}", ANNUAL_REPORT_FORM, ticker);
                date
            }
            Err(e) => {
                warn!(error = %e, "EDGAR lookup failed for {}", ticker);
                None
            }
        }
    }
}
