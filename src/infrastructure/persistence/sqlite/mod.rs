use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub mod customer_repository;
pub mod dish_repository;
pub mod ledger_store;

pub use customer_repository::SqliteCustomerRepository;
pub use dish_repository::SqliteDishRepository;
pub use ledger_store::SqliteLedgerStore;

/// Opens (and if necessary creates) the database file behind the given URL.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
  let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
  SqlitePoolOptions::new().connect_with(options).await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
  sqlx::migrate!("./migrations").run(pool).await
}
