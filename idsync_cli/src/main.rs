use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use idsync_cli::config::AppConfig;
use idsync_cli::gateway::HttpGateway;
use idsync_cli::source::CsvRowSource;
use idsync_core::{BatchDriver, BatchSummary, ProcessorOptions, RetryPolicy};
use log::error;
use std::path::PathBuf;
use std::sync::Arc;

/// Bulk user and team reconciliation against an identity-management API
///
/// Reads all data rows in FILE. Blank fields are left unchanged; set a
/// collection field to NONE (case sensitive) to clear it. Teams that do not
/// exist yet are created. Rows already marked "success" are skipped, so an
/// interrupted run can simply be re-invoked.
#[derive(Parser)]
#[command(name = "idsync", author, version, about)]
struct Cli {
    /// CSV file with user information; the first two rows are reserved
    /// headers, data starts at row 3
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: PathBuf,

    /// Create accounts for usernames that do not exist yet
    #[arg(short = 'c', long = "create")]
    create: bool,

    /// Generate API credentials for newly created service accounts
    #[arg(short = 'g', long = "generate-credentials")]
    generate_credentials: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    /// Verify TLS certificates when calling the API
    #[arg(long = "verify-ssl", value_name = "BOOL", default_value_t = true, action = clap::ArgAction::Set)]
    verify_ssl: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli).await {
        Ok(summary) => print_summary(&summary),
        Err(err) => {
            error!("An error occurred!");
            for cause in err.chain() {
                error!("{cause}");
            }
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<BatchSummary> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate()?;

    let gateway =
        HttpGateway::new(&config, cli.verify_ssl).context("Failed to create API gateway")?;
    let source = CsvRowSource::open(&cli.file)?;

    let options = ProcessorOptions {
        allow_create: cli.create,
        generate_credentials: cli.generate_credentials,
    };
    let mut driver = BatchDriver::new(source, Arc::new(gateway), RetryPolicy::default(), options);
    driver.run().await.map_err(anyhow::Error::from)
}

fn print_summary(summary: &BatchSummary) {
    println!("{}", "Run complete".green().bold());
    println!("  processed: {}", summary.processed);
    println!("  succeeded: {}", summary.succeeded.to_string().green());
    let failed = summary.failed.to_string();
    let failed = if summary.failed > 0 {
        failed.red().to_string()
    } else {
        failed
    };
    println!("  failed:    {failed}");
    println!("  skipped:   {}", summary.skipped);
}
