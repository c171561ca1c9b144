#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Eco-blocks API server binary.
//!
//! Configuration comes from the environment (see
//! [`eco_blocks_server::AppConfig::from_env`]); the flags below override
//! the listen address and database location.

use std::path::PathBuf;

use clap::Parser;
use eco_blocks_server::{AppConfig, run_server};

#[derive(Parser)]
#[command(name = "eco_blocks_server", about = "Serve the eco-blocks API", version)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// `SQLite` file for simulation and reward records
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database_path) = cli.database_path {
        config.database_path = database_path;
    }

    run_server(config).await?;
    Ok(())
}
