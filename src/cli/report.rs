use super::{freshness_signal, ui};
use crate::core::fundamentals::{FilingDateProvider, MarketValueKind};
use crate::core::service::{AssetReport, PeReport, ValuationService};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;

#[derive(Debug, Default)]
pub struct TickerReport {
    pub ticker: String,
    pub eps_pe: Option<PeReport>,
    pub income_pe: Option<PeReport>,
    pub assets: Option<AssetReport>,
}

impl TickerReport {
    pub fn has_data(&self) -> bool {
        self.eps_pe.is_some() || self.income_pe.is_some() || self.assets.is_some()
    }
}

/// All valuations for one ticker. The three series are refreshed one after another
/// and the market cap is looked up once for both cap based queries.
pub async fn build_report(
    service: &ValuationService,
    filings: Option<&dyn FilingDateProvider>,
    ticker: &str,
) -> TickerReport {
    let signal = freshness_signal(filings, ticker).await;
    let signal = signal.as_deref();

    let eps_pe = service.eps_pe(ticker, None, signal).await;
    let (income_pe, assets) = match service
        .market_value(ticker, MarketValueKind::MarketCap)
        .await
    {
        Some(cap) => (
            service.income_pe(ticker, Some(cap), signal).await,
            service.asset_valuation(ticker, Some(cap), signal).await,
        ),
        None => (None, None),
    };

    TickerReport {
        ticker: ticker.to_uppercase(),
        eps_pe,
        income_pe,
        assets,
    }
}

pub fn display_report_table(reports: &[TickerReport]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("P/E (EPS)"),
        ui::header_cell("P/E (Net income)"),
        ui::header_cell("P/NTA"),
        ui::header_cell("P/NCAV"),
    ]);

    for report in reports {
        let ticker = if report.has_data() {
            Cell::new(&report.ticker)
        } else {
            Cell::new(ui::style_text(&report.ticker, ui::StyleType::Error))
        };
        let assets = report.assets.as_ref().map(|a| &a.valuation);

        table.add_row(vec![
            ticker,
            ui::ratio_cell(report.eps_pe.as_ref().map(|r| r.valuation.pe)),
            ui::ratio_cell(report.income_pe.as_ref().map(|r| r.valuation.pe)),
            ui::ratio_cell(assets.and_then(|a| a.p_nta)),
            ui::ratio_cell(assets.and_then(|a| a.p_ncav)),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Valuation report", ui::StyleType::Title),
        table
    )
}

pub async fn run(
    service: &ValuationService,
    filings: Option<&dyn FilingDateProvider>,
    tickers: &[String],
) -> Result<()> {
    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Building report...");

    let futures = tickers.iter().map(|ticker| {
        let pb_clone = pb.clone();
        async move {
            let report = build_report(service, filings, ticker).await;
            pb_clone.inc(1);
            report
        }
    });

    let reports: Vec<TickerReport> = join_all(futures).await;
    pb.finish_and_clear();

    println!("{}", display_report_table(&reports));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fundamentals::{FundamentalsProvider, MarketValueChain, MarketValueProvider};
    use crate::core::records::{AnnualRecord, BalanceSheetRecord, EpsRecord, IncomeRecord};
    use crate::core::refresh::SeriesRefresher;
    use crate::core::service::PeBasis;
    use crate::core::valuation::{AssetValuation, PeValuation, YearPolicy};
    use crate::store::memory::MemorySeriesStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed<R>(Option<Vec<R>>);

    #[async_trait]
    impl<R: AnnualRecord> FundamentalsProvider<R> for Fixed<R> {
        async fn fetch_annual(&self, _ticker: &str) -> Option<Vec<R>> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct CountingQuote {
        cap_calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketValueProvider for CountingQuote {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_market_value(&self, _ticker: &str, kind: MarketValueKind) -> Option<f64> {
            match kind {
                MarketValueKind::Price => None,
                MarketValueKind::MarketCap => {
                    self.cap_calls.fetch_add(1, Ordering::SeqCst);
                    Some(2.0e10)
                }
            }
        }
    }

    fn refresher<R: AnnualRecord>(records: Option<Vec<R>>) -> SeriesRefresher<R> {
        SeriesRefresher::new(Arc::new(MemorySeriesStore::new()), Arc::new(Fixed(records)))
    }

    #[tokio::test]
    async fn test_build_report_looks_up_market_cap_once() {
        let income = (2018..=2024)
            .rev()
            .map(|fiscal_year| IncomeRecord {
                ticker: "ACME".to_string(),
                fiscal_year,
                net_income: 1.0e9,
            })
            .collect();
        let balance_sheet = BalanceSheetRecord {
            ticker: "ACME".to_string(),
            fiscal_year: 2024,
            total_assets: 100e9,
            total_liabilities: 50e9,
            total_current_assets: 40e9,
            goodwill: 5e9,
            intangible_assets: 0.0,
        };
        let quote = Arc::new(CountingQuote::default());
        let service = ValuationService::new(
            refresher::<EpsRecord>(None),
            refresher(Some(income)),
            refresher(Some(vec![balance_sheet])),
            MarketValueChain::new(vec![quote.clone() as Arc<dyn MarketValueProvider>]),
            YearPolicy::Consecutive,
        );

        let report = build_report(&service, None, "acme").await;

        assert_eq!(quote.cap_calls.load(Ordering::SeqCst), 1);
        assert!(report.eps_pe.is_none());
        assert!((report.income_pe.unwrap().valuation.pe - 20.0).abs() < 1e-9);
        assert_eq!(report.assets.unwrap().market_cap, 2.0e10);
    }

    #[test]
    fn test_display_report_table() {
        let reports = vec![
            TickerReport {
                ticker: "AAPL".to_string(),
                eps_pe: Some(PeReport {
                    ticker: "AAPL".to_string(),
                    basis: PeBasis::Eps,
                    market_value: 200.0,
                    last_updated: "2025-03-01".to_string(),
                    valuation: PeValuation {
                        pe: 31.25,
                        average: 6.4,
                        first_year: 2018,
                        last_year: 2024,
                    },
                }),
                income_pe: None,
                assets: Some(AssetReport {
                    ticker: "AAPL".to_string(),
                    market_cap: 3e12,
                    last_updated: "2025-03-01".to_string(),
                    valuation: AssetValuation {
                        fiscal_year: 2024,
                        nta: 5e10,
                        ncav: -1e11,
                        p_nta: Some(60.0),
                        p_ncav: None,
                    },
                }),
            },
            TickerReport {
                ticker: "NOPE".to_string(),
                ..Default::default()
            },
        ];

        let output = display_report_table(&reports);
        assert!(output.contains("31.25"));
        assert!(output.contains("60.00"));
        assert!(output.contains("NOPE"));
        assert!(!reports[1].has_data());
    }
}
