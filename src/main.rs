use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use stockval::cli::membership::MembershipCommand;
use stockval::core::log::init_logging;
use stockval::core::membership::{ConstituentRecord, IndexCode};
use stockval::core::service::PeBasis;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Basis {
    /// Share price over average EPS
    Eps,
    /// Market cap over average net income
    Income,
}

impl From<Basis> for PeBasis {
    fn from(basis: Basis) -> PeBasis {
        match basis {
            Basis::Eps => PeBasis::Eps,
            Basis::Income => PeBasis::NetIncome,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the 7-year average P/E of one or more tickers
    Pe {
        #[arg(required = true)]
        tickers: Vec<String>,
        /// Earnings measure to average
        #[arg(short, long, value_enum, default_value_t = Basis::Eps)]
        basis: Basis,
        /// Price (EPS basis) or market cap (income basis) in USD, skips the lookup
        #[arg(short, long)]
        market_value: Option<f64>,
    },
    /// Display NTA and NCAV multiples from the latest balance sheet
    Assets {
        ticker: String,
        /// Market cap in USD, skips the lookup
        #[arg(short, long)]
        market_cap: Option<f64>,
    },
    /// Display every valuation for the given tickers
    Report {
        #[arg(required = true)]
        tickers: Vec<String>,
    },
    /// Inspect or edit the index membership table
    #[command(subcommand)]
    Membership(MembershipCommands),
}

#[derive(Subcommand)]
enum MembershipCommands {
    /// Show the index history of a ticker
    Show { ticker: String },
    /// Record a ticker joining (and optionally leaving) an index
    Add {
        ticker: String,
        /// sp500 or nasdaq100
        index: IndexCode,
        #[arg(long)]
        added: Option<NaiveDate>,
        #[arg(long)]
        removed: Option<NaiveDate>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// List the members of an index
    List {
        index: IndexCode,
        /// Members on this date instead of today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Delete every row of an index
    Clear { index: IndexCode },
}

impl From<MembershipCommands> for MembershipCommand {
    fn from(cmd: MembershipCommands) -> MembershipCommand {
        match cmd {
            MembershipCommands::Show { ticker } => MembershipCommand::Show { ticker },
            MembershipCommands::Add {
                ticker,
                index,
                added,
                removed,
                name,
                reason,
            } => MembershipCommand::Add(ConstituentRecord {
                ticker,
                index_code: index,
                added_date: added,
                removed_date: removed,
                company_name: name,
                reason,
            }),
            MembershipCommands::List { index, as_of } => MembershipCommand::List { index, as_of },
            MembershipCommands::Clear { index } => MembershipCommand::Clear { index },
        }
    }
}

impl From<Commands> for stockval::AppCommand {
    fn from(cmd: Commands) -> stockval::AppCommand {
        match cmd {
            Commands::Pe {
                tickers,
                basis,
                market_value,
            } => stockval::AppCommand::Pe {
                tickers,
                basis: basis.into(),
                market_value,
            },
            Commands::Assets { ticker, market_cap } => {
                stockval::AppCommand::Assets { ticker, market_cap }
            }
            Commands::Report { tickers } => stockval::AppCommand::Report { tickers },
            Commands::Membership(cmd) => stockval::AppCommand::Membership(cmd.into()),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => stockval::cli::setup::setup_at_path(path),
            None => stockval::cli::setup::setup(),
        },
        Some(cmd) => stockval::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
