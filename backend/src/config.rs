//! Configuration management for the Greengrocer storefront backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with GG_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::ConversionFactors;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Storage backend selection
    pub storage: StorageConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Unit-to-kilogram conversion factors
    #[serde(default)]
    pub pricing: ConversionFactors,

    /// Order placement and listing configuration
    pub orders: OrdersConfig,
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
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, for demos and tests
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key the identity service signs tokens with
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrdersConfig {
    /// Order number prefix, as in `VG-20240315-001`
    pub number_prefix: String,

    /// Attempts at allocating an order number before giving up
    pub max_number_retries: u32,

    /// Default page size of a customer's order history
    pub customer_page_size: u32,

    /// Default page size of the admin order list
    pub admin_page_size: u32,

    /// Upper bound for any requested page size
    pub max_page_size: u32,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("GG_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.backend", "postgres")?
            .set_default("orders.number_prefix", "VG")?
            .set_default("orders.max_number_retries", 5)?
            .set_default("orders.customer_page_size", 10)?
            .set_default("orders.admin_page_size", 20)?
            .set_default("orders.max_page_size", 50)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (GG_ prefix)
            .add_source(
                Environment::with_prefix("GG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pricing.check().map_err(ConfigError::Message)
    }

    /// Configuration for tests and the in-memory demo mode
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
            },
            logging: LoggingConfig::default(),
            pricing: ConversionFactors::default(),
            orders: OrdersConfig::default(),
        }
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

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            number_prefix: "VG".to_string(),
            max_number_retries: 5,
            customer_page_size: 10,
            admin_page_size: 20,
            max_page_size: 50,
        }
    }
}
