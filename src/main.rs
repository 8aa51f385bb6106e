use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use mio::net::TcpListener;
use tracing::info;

use bouncer::config::Config;
use bouncer::server::{Dispatcher, signal};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();

    let shutdown = Arc::new(AtomicBool::new(false));
    signal::install(shutdown.clone()).context("failed to install signal handlers")?;

    let addr = cfg.listen_addr.parse().context("invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!("Listening on {}", cfg.listen_addr);

    let mut dispatcher = Dispatcher::new(listener, &cfg, shutdown)?;
    dispatcher.run()?;

    info!("Shutdown complete");
    Ok(())
}
