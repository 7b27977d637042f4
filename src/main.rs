use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use scorewatch::agent::{RunOptions, Runner};
use scorewatch::config::{AppConfig, Secrets, Sport};
use scorewatch::data::scope::ScopeSelector;
use scorewatch::monitoring::logger;

#[derive(Parser)]
#[command(name = "scorewatch", about = "Sports result monitor with chat webhook alerts")]
struct Cli {
    /// Config file (default: built-in config/default.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sport to check (default: run.sport from config)
    #[arg(long, value_enum)]
    sport: Option<Sport>,

    /// Check a single date (YYYY-MM-DD) instead of the rolling window
    #[arg(long, conflicts_with_all = ["from", "to"])]
    date: Option<NaiveDate>,

    /// First date of an inclusive range
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last date of an inclusive range
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Football league id to query, repeatable (default: all configured)
    #[arg(long = "league")]
    leagues: Vec<String>,

    /// What started this run; "schedule" skips the startup announcement
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "local")]
    trigger: String,

    /// Log notification payloads instead of sending them
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn run_options(&self, config: &AppConfig) -> RunOptions {
        let mut options = RunOptions::new(self.sport.unwrap_or(config.run.sport), config);
        options.scope = match (self.date, self.from, self.to) {
            (Some(date), _, _) => ScopeSelector::Date(date),
            (None, Some(from), Some(to)) => ScopeSelector::Range { from, to },
            _ => options.scope,
        };
        options.leagues = self.leagues.clone();
        options.trigger = self.trigger.clone();
        options.dry_run = self.dry_run;
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let secrets = Secrets::from_env(&config);

    logger::init_logging(&config.monitoring)?;

    let options = cli.run_options(&config);
    tracing::info!(
        sport = %options.sport,
        scope = ?options.scope,
        trigger = %options.trigger,
        "scorewatch starting"
    );

    let runner = Runner::new(config, secrets)?;
    let report = runner.run_once(&options).await?;

    // Every outcome exits 0; the signal is for the scheduler's logs.
    tracing::info!(
        signal = %report.outcome().exit_signal(),
        outcome = ?report.outcome(),
        "scorewatch finished"
    );

    Ok(())
}
