use std::process;

use clap::{Arg, Command};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::api::AppState;
use crate::config::Config;

mod api;
mod config;
mod forms;

pub const NAME: &str = "meta-server";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    println!("Starting {NAME} version {VERSION}");

    // Setup CLI
    let matches = Command::new(NAME)
        .version(VERSION)
        .about("Decodes signup forms and category trees over HTTP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .default_value("meta-server.toml"),
        )
        .get_matches();

    // Setup configuration
    let config_path = matches
        .get_one::<String>("config")
        .map_or("meta-server.toml", String::as_str);
    let cfg = Config::new(config_path).unwrap_or_else(|e| {
        eprintln!("Error loading configuration: {e}");
        process::exit(1);
    });

    // Setup logging
    let _guard = cfg.init_logger().unwrap_or_else(|e| {
        eprintln!("Error initializing logging: {e}");
        process::exit(1);
    });

    let state = match AppState::new(&cfg.decoder) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to build decoders: {e}");
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(server(api::create_router(state), &cfg)) {
        error!("Server error: {e}");
    }
    process::exit(1);
}

async fn server(app: axum::Router, cfg: &Config) -> std::io::Result<()> {
    let listener = TcpListener::bind(cfg.server.bind.as_str()).await?;
    info!(bind = %cfg.server.bind, "listening");
    axum::serve(listener, app).await
}
