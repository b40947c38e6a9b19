use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tascapos::{
  application::fiscal::{ExportSaftCommand, ExportSaftUseCase, VerifyLedgerUseCase},
  domain::fiscal::{InvoiceLedger, SeriesId},
  infrastructure::{
    config::Config,
    persistence::sqlite::{
      SqliteCustomerRepository, SqliteDishRepository, SqliteLedgerStore, run_migrations,
    },
  },
};

#[derive(Parser)]
#[command(name = "tascapos", about = "Fiscal invoicing ledger for the tasca", version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Recompute the invoice hash chain and report whether it is intact
  Verify,
  /// Produce the monthly SAF-T (AO) XML file
  Export {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    month: u32,
    /// Output file; defaults to <output_dir>/saft_ao_<year>_<month>.xml
    #[arg(long)]
    out: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialize environment variables from .env file
  dotenvy::dotenv().ok();

  // Initialize tracing subscriber for logging
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tascapos=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cli = Cli::parse();

  // Load configuration
  let config = Config::load().context("Failed to load configuration")?;
  tracing::info!("Configuration loaded successfully");

  // Set up database connection pool with timeout
  tracing::info!("Connecting to database: {}", config.database.url);
  let options = SqliteConnectOptions::from_str(&config.database.url)
    .context("Invalid database URL")?
    .create_if_missing(true);
  let pool = tokio::time::timeout(
    Duration::from_secs(config.database.connect_timeout_seconds),
    SqlitePoolOptions::new()
      .max_connections(config.database.max_connections)
      .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
      .connect_with(options),
  )
  .await
  .with_context(|| {
    format!(
      "Database connection timed out after {} seconds",
      config.database.connect_timeout_seconds
    )
  })?
  .context("Could not open the ledger database")?;

  // Run database migrations
  tracing::info!("Running database migrations");
  run_migrations(&pool)
    .await
    .context("Failed to run database migrations")?;

  let store = Arc::new(SqliteLedgerStore::new(pool.clone()));
  let customers = Arc::new(SqliteCustomerRepository::new(pool.clone()));
  let dishes = Arc::new(SqliteDishRepository::new(pool));

  match cli.command {
    Command::Verify => {
      let series = SeriesId::new(config.fiscal.series.clone())?;
      let ledger =
        InvoiceLedger::open(store, customers, series, config.currency()?).await?;
      let verify = VerifyLedgerUseCase::new(Arc::new(ledger));

      let report = verify.execute().await?;
      if report.intact {
        tracing::info!(entries = report.entries, "Hash chain intact");
        println!("OK: {} invoices, chain intact", report.entries);
      } else {
        let position = report.broken_at.unwrap_or(0);
        tracing::error!(position, "Hash chain broken");
        anyhow::bail!("Chain broken at invoice index {}", position);
      }
    }
    Command::Export { year, month, out } => {
      let export = ExportSaftUseCase::new(store, customers, dishes, config.company_profile()?);
      let response = export.execute(ExportSaftCommand { year, month }).await?;

      let path = match out {
        Some(path) => path,
        None => {
          let dir = PathBuf::from(&config.export.output_dir);
          tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
          dir.join(format!("saft_ao_{}_{:02}.xml", year, month))
        }
      };
      tokio::fs::write(&path, response.xml.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

      tracing::info!(
        entries = response.entries,
        gross_total = %response.gross_total,
        path = %path.display(),
        "SAF-T export written"
      );
      println!(
        "Exported {} invoices ({} gross) to {}",
        response.entries,
        response.gross_total,
        path.display()
      );
    }
  }

  Ok(())
}
