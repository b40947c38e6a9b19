use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::domain::fiscal::value_objects::Currency;
use crate::domain::saft::CompanyProfile;

// Default timeout functions
fn default_db_connect_timeout() -> u64 {
  5
}

fn default_db_acquire_timeout() -> u64 {
  3
}

fn default_max_connections() -> u32 {
  5
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub company: CompanyConfig,
  pub fiscal: FiscalConfig,
  pub database: DatabaseConfig,
  pub export: ExportConfig,
}

/// Issuing company, as it appears in the SAF-T header
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyConfig {
  pub tax_id: String,
  pub legal_name: String,
  pub street: String,
  pub city: String,
  pub country: String,
  pub software_cert_number: String,
  pub currency: String,
}

/// Invoicing series configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FiscalConfig {
  /// Series identifier every invoice number is issued under, e.g. "VER2025".
  pub series: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  pub url: String,
  #[serde(default = "default_max_connections")]
  pub max_connections: u32,
  #[serde(default = "default_db_connect_timeout")]
  pub connect_timeout_seconds: u64,
  #[serde(default = "default_db_acquire_timeout")]
  pub acquire_timeout_seconds: u64,
}

/// SAF-T export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
  pub output_dir: String,
}

impl Config {
  /// Load configuration from files and environment variables
  ///
  /// Configuration is loaded in the following order (later sources override earlier ones):
  /// 1. config/default.toml
  /// 2. config/local.toml (if exists)
  /// 3. config/{RUN_MODE}.toml (if exists)
  /// 4. Environment variables with TASCAPOS_ prefix
  ///
  /// # Environment Variables
  ///
  /// Environment variables use the TASCAPOS_ prefix and are separated by double underscores:
  /// - `TASCAPOS_DATABASE__URL=sqlite://data/ledger.db`
  /// - `TASCAPOS_FISCAL__SERIES=VER2025`
  /// - `TASCAPOS_COMPANY__TAX_ID=5417000123`
  ///
  /// # Errors
  ///
  /// Returns a `ConfigError` if:
  /// - Required configuration files are missing
  /// - Configuration files contain invalid TOML
  /// - Required configuration values are missing
  /// - Configuration values have invalid types
  pub fn load() -> Result<Self, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    let config = ConfigBuilder::builder()
      // Start with default configuration
      .add_source(File::with_name("config/default").required(true))
      // Add optional local configuration (for local development overrides)
      .add_source(File::with_name("config/local").required(false))
      // Add optional environment-specific configuration
      .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
      // Add environment variables with TASCAPOS_ prefix
      // Use double underscore as separator: TASCAPOS_DATABASE__URL=...
      .add_source(
        Environment::with_prefix("TASCAPOS")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    config.try_deserialize()
  }

  pub fn currency(&self) -> Result<Currency, ConfigError> {
    Currency::from_str(&self.company.currency)
      .map_err(|e| ConfigError::Message(format!("Invalid company.currency: {}", e)))
  }

  pub fn company_profile(&self) -> Result<CompanyProfile, ConfigError> {
    Ok(CompanyProfile {
      tax_id: self.company.tax_id.clone(),
      legal_name: self.company.legal_name.clone(),
      street: self.company.street.clone(),
      city: self.company.city.clone(),
      country: self.company.country.clone(),
      software_cert_number: self.company.software_cert_number.clone(),
      currency: self.currency()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_structure() {
    // This test verifies that the Config structure can be deserialized
    let toml = r#"
            [company]
            tax_id = "5417000123"
            legal_name = "Tasca do Verissimo Lda"
            street = "Rua da Missao 42"
            city = "Luanda"
            country = "AO"
            software_cert_number = "318/AGT/2024"
            currency = "AOA"

            [fiscal]
            series = "VER2025"

            [database]
            url = "sqlite://data/ledger.db"

            [export]
            output_dir = "./data/exports"
        "#;

    let config: Config = toml::from_str(toml).expect("Failed to parse config");

    assert_eq!(config.company.legal_name, "Tasca do Verissimo Lda");
    assert_eq!(config.fiscal.series, "VER2025");
    assert_eq!(config.database.url, "sqlite://data/ledger.db");
    assert_eq!(config.database.max_connections, 5); // default
    assert_eq!(config.database.connect_timeout_seconds, 5); // default
    assert_eq!(config.database.acquire_timeout_seconds, 3); // default
    assert_eq!(config.export.output_dir, "./data/exports");
    assert_eq!(config.currency().unwrap(), Currency::AOA);

    let profile = config.company_profile().unwrap();
    assert_eq!(profile.tax_id, "5417000123");
    assert_eq!(profile.currency, Currency::AOA);
  }

  #[test]
  fn test_invalid_currency_rejected() {
    let toml = r#"
            [company]
            tax_id = "5417000123"
            legal_name = "Tasca do Verissimo Lda"
            street = "Rua da Missao 42"
            city = "Luanda"
            country = "AO"
            software_cert_number = "318/AGT/2024"
            currency = "EUR"

            [fiscal]
            series = "VER2025"

            [database]
            url = "sqlite::memory:"

            [export]
            output_dir = "./data/exports"
        "#;

    let config: Config = toml::from_str(toml).expect("Failed to parse config");
    assert!(config.currency().is_err());
  }
}
