pub mod assets;
pub mod membership;
pub mod pe;
pub mod report;
pub mod setup;
pub mod ui;

use crate::core::fundamentals::FilingDateProvider;

/// Latest annual filing date of `ticker`, when a filing source is configured.
pub async fn freshness_signal(
    filings: Option<&dyn FilingDateProvider>,
    ticker: &str,
) -> Option<String> {
    match filings {
        Some(provider) => provider.latest_annual_filing_date(ticker).await,
        None => None,
    }
}
