//! Debase License Server
//!
//! Handles license purchases, license activation on client machines, and
//! trial grants.
//!
//! Usage:
//!   debase-license-server --db licenses.duckdb serve --addr 0.0.0.0:8080
//!   debase-license-server --db licenses.duckdb grant --email user@example.com --count 2

use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use debase_license::Email;
use debase_license_server::{build_router, AppState, ServerConfig};
use debase_payment::{grant_licenses, LicenseCount, StripeProvider, LICENSE_PRICE_CENTS};
use debase_store::{DuckDbStore, LicenseStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Longest trial the server will grant.
const MAX_TRIAL_DAYS: i64 = 3650;

#[derive(Parser, Debug)]
#[command(name = "debase-license-server")]
#[command(about = "Debase license purchase, activation and trial server")]
struct Args {
    /// Namespace mixed into every user id
    #[arg(long, env = "DEBASE_DOMAIN", default_value = "debase.app", global = true)]
    domain: String,

    /// Path to the DuckDB database (in-memory if omitted)
    #[arg(long, env = "DEBASE_DB", global = true)]
    db: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        addr: SocketAddr,

        /// Payment provider secret key
        #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
        stripe_key: String,

        /// Price of one license in USD cents
        #[arg(
            long,
            env = "DEBASE_LICENSE_PRICE",
            default_value_t = LICENSE_PRICE_CENTS,
            value_parser = clap::value_parser!(i64).range(1..)
        )]
        license_price: i64,

        /// Length of a trial in days
        #[arg(
            long,
            env = "DEBASE_TRIAL_DAYS",
            default_value_t = 7,
            value_parser = clap::value_parser!(i64).range(1..=MAX_TRIAL_DAYS)
        )]
        trial_days: i64,
    },

    /// Mint licenses for an email after an out-of-band purchase
    Grant {
        /// Owner email
        #[arg(long)]
        email: String,

        /// Number of licenses to mint
        #[arg(long, default_value_t = 1)]
        count: i64,
    },
}

fn open_store(db: Option<&PathBuf>) -> Result<Arc<dyn LicenseStore>> {
    let store = match db {
        Some(path) => {
            info!("Opening license database at {:?}", path);
            DuckDbStore::open(path).context("Failed to open license database")?
        }
        None => {
            info!("Using in-memory license database");
            DuckDbStore::open_in_memory().context("Failed to open in-memory database")?
        }
    };
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let store = open_store(args.db.as_ref())?;

    match args.command {
        Command::Serve {
            addr,
            stripe_key,
            license_price,
            trial_days,
        } => {
            let state = AppState {
                store,
                payments: Arc::new(StripeProvider::new(stripe_key)),
                config: Arc::new(ServerConfig {
                    domain: args.domain,
                    license_price_cents: license_price,
                    trial_duration: chrono::Duration::days(trial_days),
                }),
            };

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!(%addr, "Debase license server listening");
            axum::serve(listener, build_router(state))
                .await
                .context("HTTP server failed")?;
        }
        Command::Grant { email, count } => {
            let email = Email::parse(&email)?;
            let count = LicenseCount::new(count)?;
            let codes = grant_licenses(store.as_ref(), &args.domain, &email, count)?;
            for code in codes {
                println!("{code}");
            }
        }
    }

    Ok(())
}
