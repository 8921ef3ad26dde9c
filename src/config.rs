use clap::{Parser, Subcommand};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub model: String, // Model the engine is asked to reason with
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: Option<usize>, // None keeps every result
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub default_data_source: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Base URL of the BI engine
    #[arg(long, global = true)]
    pub engine_url: Option<String>,

    /// Per-request timeout for BI engine calls, in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Answer a single question and print the report
    Query {
        /// Natural-language question
        intent: String,
        /// Data source to query
        #[arg(long)]
        db_source: Option<String>,
    },
    /// Check whether the BI engine is reachable
    Health,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        // Start with default configuration
        let mut config_builder = Config::builder()
            .set_default("web.host", defaults.web.host)?
            .set_default("web.port", i64::from(defaults.web.port))?
            .set_default("engine.base_url", defaults.engine.base_url)?
            .set_default("engine.timeout_secs", defaults.engine.timeout_secs as i64)?
            .set_default("engine.model", defaults.engine.model)?
            .set_default("cache.enabled", defaults.cache.enabled)?
            .set_default("default_data_source", defaults.default_data_source)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/bi-gateway/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // e.g. BI_GATEWAY_ENGINE__BASE_URL
        config_builder = config_builder.add_source(
            Environment::with_prefix("BI_GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Build the config
        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(engine_url) = &args.engine_url {
            config.engine.base_url = engine_url.clone();
        }
        if let Some(timeout) = args.timeout {
            config.engine.timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "engine.base_url must not be empty".to_string(),
            ));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "engine.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::Message(
                "cache.max_entries must be greater than zero when set".to_string(),
            ));
        }
        if self.default_data_source.trim().is_empty() {
            return Err(ConfigError::Message(
                "default_data_source must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            engine: EngineConfig {
                base_url: "http://localhost:8081".to_string(),
                timeout_secs: 60,
                model: "gpt-4".to_string(),
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: None,
            },
            default_data_source: "default".to_string(),
        }
    }
}
