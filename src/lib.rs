pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::membership::MembershipCommand;
use crate::core::config::{
    AppConfig, DEFAULT_ALPHA_VANTAGE_URL, DEFAULT_EXCHANGE_RATE_URL, DEFAULT_YAHOO_URL,
};
use crate::core::currency::{CurrencyConverter, ExchangeRateCache};
use crate::core::fundamentals::{FilingDateProvider, MarketValueChain, MarketValueProvider};
use crate::core::records::{BalanceSheetRecord, EpsRecord, IncomeRecord};
use crate::core::refresh::SeriesRefresher;
use crate::core::service::{PeBasis, ValuationService};
use crate::core::valuation::YearPolicy;
use crate::providers::alpha_vantage::AlphaVantageProvider;
use crate::providers::exchange_rate::OpenErApiSource;
use crate::providers::sec_edgar::SecEdgarProvider;
use crate::providers::util::{USER_AGENT, build_client};
use crate::providers::yahoo_finance::YahooFinanceProvider;
use crate::store::FundamentalsStore;
use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Pe {
        tickers: Vec<String>,
        basis: PeBasis,
        market_value: Option<f64>,
    },
    Assets {
        ticker: String,
        market_cap: Option<f64>,
    },
    Report {
        tickers: Vec<String>,
    },
    Membership(MembershipCommand),
}

/// Everything a command needs, wired from the configuration.
pub struct App {
    pub service: ValuationService,
    pub filings: Option<Arc<dyn FilingDateProvider>>,
    pub store: FundamentalsStore,
}

impl App {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?;
        let store = FundamentalsStore::open(&data_path)?;

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = build_client(USER_AGENT, timeout)?;
        let providers = &config.providers;

        let exchange_rate_url = providers
            .exchange_rate
            .as_ref()
            .map_or(DEFAULT_EXCHANGE_RATE_URL, |p| &p.base_url);
        let converter = Arc::new(CurrencyConverter::new(
            Arc::new(OpenErApiSource::new(exchange_rate_url, client.clone())),
            Arc::new(ExchangeRateCache::new()),
        ));

        let alpha_vantage_url = providers
            .alpha_vantage
            .as_ref()
            .map_or(DEFAULT_ALPHA_VANTAGE_URL, |p| &p.base_url);
        let alpha_vantage = Arc::new(AlphaVantageProvider::new(
            alpha_vantage_url,
            config.alpha_vantage_api_key(),
            client.clone(),
            Arc::clone(&converter),
        ));

        let yahoo_url = providers
            .yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_URL, |p| &p.base_url);
        let yahoo = Arc::new(YahooFinanceProvider::new(
            yahoo_url,
            client.clone(),
            Arc::clone(&converter),
        ));

        let market_sources = vec![
            alpha_vantage.clone() as Arc<dyn MarketValueProvider>,
            yahoo as Arc<dyn MarketValueProvider>,
        ];

        let filings: Option<Arc<dyn FilingDateProvider>> = match &providers.sec_edgar {
            Some(sec) => {
                let sec_client = build_client(&sec.user_agent, timeout)?;
                Some(Arc::new(SecEdgarProvider::new(
                    &sec.base_url,
                    &sec.data_url,
                    sec_client,
                )))
            }
            None => {
                debug!("SEC EDGAR not configured, cached fundamentals never expire");
                None
            }
        };

        let service = ValuationService::new(
            SeriesRefresher::<EpsRecord>::new(store.earnings.clone(), alpha_vantage.clone()),
            SeriesRefresher::<IncomeRecord>::new(store.income.clone(), alpha_vantage.clone()),
            SeriesRefresher::<BalanceSheetRecord>::new(
                store.balance_sheets.clone(),
                alpha_vantage,
            ),
            MarketValueChain::new(market_sources),
            YearPolicy::from_flag(config.require_consecutive_years),
        );

        Ok(App {
            service,
            filings,
            store,
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("stockval starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        data_path = ?config.data_path,
        consecutive_years = config.require_consecutive_years,
        "Loaded config"
    );

    let app = App::from_config(&config)?;
    let filings = app.filings.as_deref();

    match command {
        AppCommand::Pe {
            tickers,
            basis,
            market_value,
        } => cli::pe::run(&app.service, filings, &tickers, basis, market_value).await,
        AppCommand::Assets { ticker, market_cap } => {
            cli::assets::run(&app.service, filings, &ticker, market_cap).await
        }
        AppCommand::Report { tickers } => cli::report::run(&app.service, filings, &tickers).await,
        AppCommand::Membership(command) => cli::membership::run(
            app.store.constituents.as_ref(),
            command,
            Local::now().date_naive(),
        ),
    }
}
