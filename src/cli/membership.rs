use super::ui;
use crate::core::membership::{ConstituentRecord, IndexCode, IndexMembership, MembershipStore};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;
use tracing::info;

#[derive(Debug, Clone)]
pub enum MembershipCommand {
    /// Index history of one ticker.
    Show { ticker: String },
    /// Record a stint of a ticker inside an index.
    Add(ConstituentRecord),
    /// Members of an index, today or on a given date.
    List {
        index: IndexCode,
        as_of: Option<NaiveDate>,
    },
    /// Drop all rows of an index.
    Clear { index: IndexCode },
}

pub fn display_memberships(
    ticker: &str,
    memberships: &[IndexMembership],
    today: NaiveDate,
) -> String {
    if memberships.is_empty() {
        return format!(
            "{} is not recorded in any index",
            ui::style_text(ticker, ui::StyleType::Label)
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Index"),
        ui::header_cell("Added"),
        ui::header_cell("Removed"),
        ui::header_cell("Years"),
        ui::header_cell("Reason"),
    ]);

    let date_cell = |date: Option<NaiveDate>, empty: &str| {
        Cell::new(date.map_or_else(|| empty.to_string(), |d| d.format("%Y-%m-%d").to_string()))
    };

    for membership in memberships {
        let index_name = if membership.is_current() {
            ui::style_text(membership.index_name(), ui::StyleType::Good)
        } else {
            membership.index_name().to_string()
        };

        table.add_row(vec![
            Cell::new(index_name),
            date_cell(membership.added_date, "unknown"),
            date_cell(membership.removed_date, "current"),
            ui::format_optional_cell(membership.years_in_index(today), |y| format!("{y:.1}")),
            Cell::new(membership.reason.as_deref().unwrap_or("")),
        ]);
    }

    format!(
        "Index membership: {}\n\n{}",
        ui::style_text(ticker, ui::StyleType::Title),
        table
    )
}

pub fn run(
    store: &dyn MembershipStore,
    command: MembershipCommand,
    today: NaiveDate,
) -> Result<()> {
    match command {
        MembershipCommand::Show { ticker } => {
            let memberships = store.get_stock_memberships(&ticker)?;
            println!(
                "{}",
                display_memberships(&ticker.to_uppercase(), &memberships, today)
            );
        }
        MembershipCommand::Add(record) => {
            if store.insert_constituent(&record)? {
                info!("Added {} to {}", record.ticker, record.index_code);
                println!(
                    "Recorded {} in {}",
                    record.ticker.to_uppercase(),
                    record.index_code.display_name()
                );
            } else {
                println!(
                    "{}",
                    ui::style_text("Membership already recorded", ui::StyleType::Subtle)
                );
            }
        }
        MembershipCommand::List { index, as_of } => {
            let tickers = store.get_index_constituents(index, as_of)?;
            let when = as_of.map_or_else(|| "today".to_string(), |d| d.to_string());
            println!(
                "{} constituents ({}, {}): {}",
                ui::style_text(index.display_name(), ui::StyleType::Title),
                when,
                tickers.len(),
                tickers.join(", ")
            );
        }
        MembershipCommand::Clear { index } => {
            let removed = store.delete_index_data(index)?;
            info!("Removed {} rows of {}", removed, index);
            println!("Removed {} {} rows", removed, index.display_name());
        }
    }
    Ok(())
}
