//! `payload-enc-svc` — encryption service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the tracing subscriber.
//! 3. Provision the RSA keypair and warm the in-memory [`KeyStore`] cache;
//!    a provisioning failure aborts startup, since encrypted routes cannot
//!    be served without a keypair.
//! 4. Build the Axum router and start the HTTP server.

mod config;
mod crypto;
mod keys;
mod payload;
mod server;
mod telemetry;

#[cfg(test)]
mod test_util;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::keys::KeyStore;
use crate::server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        http_port = cfg.http_port,
        "payload-enc-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key provisioning
    // -----------------------------------------------------------------------
    let key_store = KeyStore::new(&cfg.keys_dir);
    key_store
        .provision()
        .await
        .context("RSA keypair provisioning failed")?;

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(key_store);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.http_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
