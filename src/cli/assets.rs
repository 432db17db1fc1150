use super::{freshness_signal, ui};
use crate::core::fundamentals::FilingDateProvider;
use crate::core::service::{AssetReport, ValuationService};
use crate::core::valuation::format_currency;
use anyhow::{Result, bail};
use comfy_table::Cell;

pub fn display_asset_report(report: &AssetReport) -> String {
    let valuation = &report.valuation;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Measure"),
        ui::header_cell("Value"),
        ui::header_cell("Multiple"),
    ]);

    table.add_row(vec![
        Cell::new("Net tangible assets"),
        ui::amount_cell(valuation.nta, format_currency),
        ui::ratio_cell(valuation.p_nta),
    ]);
    table.add_row(vec![
        Cell::new("Net current asset value"),
        ui::amount_cell(valuation.ncav, format_currency),
        ui::ratio_cell(valuation.p_ncav),
    ]);

    format!(
        "{} {} (FY{}, market cap {})\n\n{}\n{}",
        ui::style_text("Asset valuation:", ui::StyleType::Title),
        ui::style_text(&report.ticker, ui::StyleType::Label),
        valuation.fiscal_year,
        format_currency(report.market_cap),
        table,
        ui::style_text(
            &format!("Balance sheet cached {}", report.last_updated),
            ui::StyleType::Subtle
        )
    )
}

pub async fn run(
    service: &ValuationService,
    filings: Option<&dyn FilingDateProvider>,
    ticker: &str,
    market_cap: Option<f64>,
) -> Result<()> {
    let signal = freshness_signal(filings, ticker).await;
    let Some(report) = service
        .asset_valuation(ticker, market_cap, signal.as_deref())
        .await
    else {
        bail!("No balance sheet or market cap available for {}", ticker);
    };

    println!("{}", display_asset_report(&report));
    Ok(())
}
