//! Configuration management for the Warehouse Inventory Dashboard
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with WID_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{ColumnSchema, FixedField, DEFAULT_LOW_STOCK_THRESHOLD};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration; persistence is skipped when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Inventory reconciliation settings
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Initial low stock threshold (1-100)
    pub low_stock_threshold: u32,

    /// Header of the column that opens the location span
    pub start_anchor: String,

    /// Header of the column that closes the location span
    pub end_anchor: String,

    /// Known location columns; when set, only these are read as locations
    #[serde(default)]
    pub location_columns: Option<Vec<String>>,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("WID_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default(
                "inventory.low_stock_threshold",
                i64::from(DEFAULT_LOW_STOCK_THRESHOLD),
            )?
            .set_default("inventory.start_anchor", "QTYAVAILABLE")?
            .set_default("inventory.end_anchor", "TOTAL")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WID_ prefix)
            .add_source(
                Environment::with_prefix("WID")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl InventoryConfig {
    /// Column schema from the configured anchor headers
    pub fn column_schema(&self) -> Result<ColumnSchema, String> {
        let anchor = |header: &str| {
            FixedField::from_header(header)
                .ok_or_else(|| format!("Unknown anchor column '{}'", header))
        };
        let schema = ColumnSchema {
            start_anchor: anchor(&self.start_anchor)?,
            end_anchor: anchor(&self.end_anchor)?,
        };
        if schema.start_anchor == schema.end_anchor {
            return Err("Start and end anchor columns must differ".to_string());
        }
        Ok(schema)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            start_anchor: "QTYAVAILABLE".to_string(),
            end_anchor: "TOTAL".to_string(),
            location_columns: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_anchors_resolve() {
        let schema = InventoryConfig::default().column_schema().unwrap();
        assert_eq!(schema, ColumnSchema::default());
    }

    #[test]
    fn test_unknown_anchor_rejected() {
        let config = InventoryConfig {
            start_anchor: "Bin".to_string(),
            ..InventoryConfig::default()
        };
        assert!(config.column_schema().is_err());
    }

    #[test]
    fn test_identical_anchors_rejected() {
        let config = InventoryConfig {
            end_anchor: "qty available".to_string(),
            ..InventoryConfig::default()
        };
        assert!(config.column_schema().is_err());
    }
}
