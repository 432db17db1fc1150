use super::{freshness_signal, ui};
use crate::core::fundamentals::FilingDateProvider;
use crate::core::service::{PeBasis, PeReport, ValuationService};
use crate::core::valuation::{PE_YEARS, format_currency};
use anyhow::{Result, bail};
use comfy_table::Cell;
use futures::future::join_all;

/// Renders one row per ticker; tickers without a valuation show N/A.
pub fn display_pe_table(basis: PeBasis, results: &[(String, Option<PeReport>)]) -> String {
    let mut table = ui::new_styled_table();
    let (value_header, average_header) = match basis {
        PeBasis::Eps => ("Price", "Avg EPS"),
        PeBasis::NetIncome => ("Market cap", "Avg net income"),
    };

    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell(value_header),
        ui::header_cell(average_header),
        ui::header_cell("Years"),
        ui::header_cell(&format!("{PE_YEARS}y P/E")),
        ui::header_cell("Updated"),
    ]);

    for (ticker, report) in results {
        let Some(report) = report else {
            table.add_row(vec![
                Cell::new(ticker),
                ui::format_optional_cell::<f64>(None, |v| v.to_string()),
                ui::format_optional_cell::<f64>(None, |v| v.to_string()),
                Cell::new(""),
                ui::ratio_cell(None),
                Cell::new(""),
            ]);
            continue;
        };

        let (market_value, average) = match basis {
            PeBasis::Eps => (
                format!("${:.2}", report.market_value),
                format!("${:.2}", report.valuation.average),
            ),
            PeBasis::NetIncome => (
                format_currency(report.market_value),
                format_currency(report.valuation.average),
            ),
        };

        table.add_row(vec![
            Cell::new(&report.ticker),
            Cell::new(market_value),
            ui::amount_cell(report.valuation.average, |_| average.clone()),
            Cell::new(format!(
                "{}-{}",
                report.valuation.first_year, report.valuation.last_year
            )),
            ui::ratio_cell(Some(report.valuation.pe)),
            Cell::new(ui::style_text(&report.last_updated, ui::StyleType::Subtle)),
        ]);
    }

    format!(
        "{} P/E ({})\n\n{}",
        ui::style_text("Valuation", ui::StyleType::Title),
        basis,
        table
    )
}

pub async fn run(
    service: &ValuationService,
    filings: Option<&dyn FilingDateProvider>,
    tickers: &[String],
    basis: PeBasis,
    market_value: Option<f64>,
) -> Result<()> {
    if market_value.is_some() && tickers.len() > 1 {
        bail!("A market value can only be supplied for a single ticker");
    }

    let pb = ui::new_progress_bar(tickers.len() as u64, true);
    pb.set_message("Computing P/E...");

    let futures = tickers.iter().map(|ticker| {
        let pb_clone = pb.clone();
        async move {
            let signal = freshness_signal(filings, ticker).await;
            let report = match basis {
                PeBasis::Eps => service.eps_pe(ticker, market_value, signal.as_deref()).await,
                PeBasis::NetIncome => {
                    service
                        .income_pe(ticker, market_value, signal.as_deref())
                        .await
                }
            };
            pb_clone.inc(1);
            (ticker.to_uppercase(), report)
        }
    });

    let results: Vec<(String, Option<PeReport>)> = join_all(futures).await;
    pb.finish_and_clear();

    println!("{}", display_pe_table(basis, &results));
    Ok(())
}
