//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `geolocate` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use geolocate::config::{
    DEFAULT_HTTP_PORT, DEFAULT_LANGUAGE, DEFAULT_STORE_DIR, HTTP_PORT_ENV, PUBLIC_IP_URL,
    UPDATE_URL_ENV,
};
use geolocate::initialization::{init_client, init_logger_with};
use geolocate::{await_update, Config, GeoDb, LogFormat, LogLevel};

/// Resolve IP addresses to locations with a self-updating GeoLite2 database
#[derive(Parser, Debug)]
#[command(name = "geolocate", version, about)]
struct Cli {
    /// Store directory for the version marker and databases [default: ~/.geoip]
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Update source (gzip-compressed tar holding a .mmdb file)
    #[arg(long, global = true, env = UPDATE_URL_ENV, value_name = "URL")]
    source_url: Option<String>,

    /// Log level: error, warn, info, debug, or trace
    #[arg(long, global = true, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log format: plain or json
    #[arg(long, global = true, value_enum, default_value = "plain")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up addresses (this machine's public address if none are given)
    Lookup {
        /// Addresses, comma or space separated
        #[arg(value_name = "IPS")]
        ips: Vec<String>,

        /// Language of the place names
        #[arg(long, short, default_value = DEFAULT_LANGUAGE)]
        lang: String,
    },
    /// Download and install the latest database
    Update,
    /// Show the installed database
    Info,
    /// Serve the HTTP lookup API
    Serve {
        #[arg(long, short, env = HTTP_PORT_ENV, default_value_t = DEFAULT_HTTP_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = Config {
        dir: cli.dir.clone().unwrap_or_else(default_store_dir),
        source_url: cli.source_url.clone(),
        ..Default::default()
    };

    if let Err(e) = run(cli.command, config).await {
        eprintln!("geolocate error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, config: Config) -> Result<()> {
    let db = Arc::new(GeoDb::new(&config).context("Failed to create database engine")?);
    db.open()
        .await
        .with_context(|| format!("Failed to open database in {:?}", db.dir()))?;

    match command {
        Command::Lookup { ips, lang } => lookup(&db, ips, &lang).await,
        Command::Update => update(&db).await,
        Command::Info => info(&db).await,
        Command::Serve { port } => geolocate::server::start_server(port, db).await,
    }
}

async fn lookup(db: &GeoDb, ips: Vec<String>, lang: &str) -> Result<()> {
    let ips = if ips.is_empty() {
        public_ips().await.context("Failed to discover public address")?
    } else {
        ips
    };

    let mut failed = 0usize;
    for ip in dedup_addresses(&ips) {
        match db.find(&ip, lang) {
            Ok(result) => println!("{}", result),
            Err(e) => {
                failed += 1;
                println!("{}: error: {}", ip, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} lookup{} failed", failed, if failed == 1 { "" } else { "s" });
    }
    Ok(())
}

async fn update(db: &Arc<GeoDb>) -> Result<()> {
    match await_update(db.update()).await {
        Ok(version) => println!("✅ Updated to {}", version),
        Err(e) if e.is_up_to_date() => println!("Database is already up to date"),
        Err(e) => return Err(e).context("Update failed"),
    }
    Ok(())
}

async fn info(db: &GeoDb) -> Result<()> {
    let installed = db.installed_version().await?;
    let metadata = db.metadata()?;

    println!("Store:      {}", db.dir().display());
    println!("Source:     {}", db.source_url());
    println!("Installed:  {}", installed);
    println!("Database:   {} {}", metadata.database_type, metadata.version_string());
    println!("Languages:  {}", metadata.languages.join(", "));
    Ok(())
}

#[derive(Deserialize)]
struct PublicIp {
    origin: String,
}

/// Asks a public echo service for this machine's address(es).
async fn public_ips() -> Result<Vec<String>> {
    let client = init_client(Duration::from_secs(10))?;
    let body = client
        .get(PUBLIC_IP_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let public: PublicIp = serde_json::from_str(&body)
        .with_context(|| format!("Unexpected response from {}", PUBLIC_IP_URL))?;
    Ok(vec![public.origin])
}

/// Splits on commas, trims, and drops blanks and repeats, keeping first-seen order.
fn dedup_addresses(inputs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .flat_map(|input| input.split(','))
        .map(str::trim)
        .filter(|ip| !ip.is_empty() && seen.insert(ip.to_string()))
        .map(str::to_string)
        .collect()
}

fn default_store_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(DEFAULT_STORE_DIR)
}
