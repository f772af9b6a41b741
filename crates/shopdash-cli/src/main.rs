mod report;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use shopdash_core::{parse_day, DateRange, FilterMode};
use tracing_subscriber::EnvFilter;

use crate::report::{ReportCommands, ReportDefaults};

#[derive(Debug, Parser)]
#[command(name = "shopdash-cli")]
#[command(about = "Shopping scrape analytics from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the configured database answers
    Ping,
    /// List clients
    Clients,
    /// List a client's tracked keywords
    Keywords {
        #[arg(long)]
        client: String,
    },
    /// Print one metric as a table
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

/// Options shared by every `report` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ReportArgs {
    /// Client name
    #[arg(long)]
    pub client: String,
    /// Keyword filter; repeat for several keywords where supported
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,
    /// First scrape day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Last scrape day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
    /// Maximum rows for ranked reports [default: SHOPDASH_TOP_N]
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=100))]
    pub limit: Option<i64>,
}

impl ReportArgs {
    /// No bounds means all time; one bound is completed with the default
    /// window.
    pub(crate) fn range(&self, today: NaiveDate, default_days: u64) -> Option<DateRange> {
        if self.from.is_none() && self.to.is_none() {
            return None;
        }
        Some(DateRange::resolve(self.from, self.to, today, default_days))
    }

    /// `--limit`, else the configured top-N, kept within `1..=100`.
    pub(crate) fn limit(&self, top_n: i64) -> i64 {
        self.limit.unwrap_or(top_n).clamp(1, 100)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_day(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got '{raw}'"))
}

fn parse_mode(raw: &str) -> Result<FilterMode, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("shopdash-cli: run with --help to list commands");
        return Ok(());
    };

    let config = shopdash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let conn = shopdash_db::Connection::connect(&config)?;
    tracing::debug!(backend = conn.backend_name(), "connection configured");
    let defaults = ReportDefaults {
        today: Utc::now().date_naive(),
        range_days: u64::try_from(config.default_range_days).unwrap_or(30),
        top_n: config.top_n,
    };

    match command {
        Commands::Ping => report::run_ping(&conn).await,
        Commands::Clients => report::run_clients(&conn).await,
        Commands::Keywords { client } => report::run_keywords(&conn, &client).await,
        Commands::Report { command } => {
            report::run_report(&conn, &command, &defaults).await
        }
    }
}
