//! Waypost server entry point

use clap::{Arg, Command};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use waypost_core::auth::TokenSigner;
use waypost_engine::{StorageEngine, Store};

mod auth_gate;
mod handlers;
mod server;
mod uploads;

use server::{AppContext, WaypostServer};
use uploads::LocalImageStore;

const TOKEN_TTL_SECS: u64 = 3600;
const MAX_CONCURRENT_HASHES: usize = 4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let matches = Command::new("waypost-server")
        .version("0.1.0")
        .about("Location-sharing service backend")
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("PATH")
                .help("Data directory path")
                .default_value("./data"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Bind address")
                .default_value("127.0.0.1:5000"),
        )
        .arg(
            Arg::new("upload-dir")
                .long("upload-dir")
                .value_name("PATH")
                .help("Root directory of stored images")
                .default_value("./uploads"),
        )
        .arg(
            Arg::new("token-secret")
                .long("token-secret")
                .value_name("SECRET")
                .env("WAYPOST_TOKEN_SECRET")
                .help("Process-wide token signing secret")
                .required(true),
        )
        .get_matches();

    let data_dir: PathBuf = matches
        .get_one::<String>("data-dir")
        .unwrap()
        .parse()
        .expect("Invalid data directory path");

    let bind_addr: SocketAddr = matches
        .get_one::<String>("bind")
        .unwrap()
        .parse()
        .expect("Invalid bind address");

    info!("Starting waypost server");
    info!("Data directory: {}", data_dir.display());
    info!("Bind address: {}", bind_addr);

    // Create data directory if it doesn't exist
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        info!("Created data directory: {}", data_dir.display());
    }

    let engine = StorageEngine::new(&data_dir)
        .map_err(|e| format!("Failed to initialize storage engine: {}", e))?;
    let store = Store::open(engine).map_err(|e| format!("Failed to open store: {}", e))?;

    info!("Storage engine initialized");

    let signer = TokenSigner::new(matches.get_one::<String>("token-secret").unwrap().as_bytes());
    let images = Arc::new(LocalImageStore::new(
        matches.get_one::<String>("upload-dir").unwrap(),
    ));

    let ctx = AppContext::new(
        store,
        signer,
        images,
        Duration::from_secs(TOKEN_TTL_SECS),
        MAX_CONCURRENT_HASHES,
    );

    let server = WaypostServer::new(ctx);

    match server.serve(bind_addr).await {
        Ok(_) => info!("Server shutdown gracefully"),
        Err(e) => {
            warn!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
