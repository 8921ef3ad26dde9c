use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod engine;
mod gateway;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs, Command};
use crate::engine::client::{EngineClient, EngineLease};
use crate::engine::BiEngine;
use crate::gateway::{tools, Gateway};
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Using BI engine at {}", config.engine.base_url);
    let client = Arc::new(EngineClient::from_config(&config.engine)?);

    match args.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(config, client).await,
        Command::Query { intent, db_source } => {
            let lease = EngineLease::new(client)?;
            let gateway = Gateway::new(lease.engine(), &config.cache);
            let data_source = db_source.unwrap_or_else(|| config.default_data_source.clone());

            println!("{}", tools::query_report(&gateway, &intent, &data_source).await);
            Ok(())
        }
        Command::Health => {
            let healthy = {
                let lease = EngineLease::new(client)?;
                lease.health().await
            };

            println!("{}", tools::describe_health(healthy));
            if !healthy {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn serve(
    config: AppConfig,
    client: Arc<EngineClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine: Arc<dyn BiEngine> = Arc::clone(&client) as Arc<dyn BiEngine>;
    let gateway = Gateway::new(engine, &config.cache);
    let app_state = Arc::new(AppState::new(config.clone(), gateway));

    if !app_state.gateway.health().await {
        // Keep serving; requests fail individually until the engine is back
        error!("BI engine at {} is not reachable", config.engine.base_url);
    }

    // Start the web server
    info!("Starting BI gateway on {}:{}", config.web.host, config.web.port);
    let outcome = web::run_server(config.web, app_state).await;
    client.release();

    match outcome {
        Ok(_) => {
            info!("Server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(e.into())
        }
    }
}
