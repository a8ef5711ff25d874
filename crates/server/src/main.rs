use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use gale_common::DEFAULT_ADDR;
use gale_server::run;
use gale_storage::Cache;

#[derive(Parser, Debug)]
#[command(name = "gale-server", about = "GaleCache — in-memory cache server")]
struct Args {
    /// Endereço de escuta (host:porta)
    #[arg(long, default_value = DEFAULT_ADDR)]
    address: String,

    /// Máximo de entradas no cache (0 = sem limite)
    #[arg(long, default_value_t = 0)]
    max_entries: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gale_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let cache = Cache::new(args.max_entries);

    let listener = TcpListener::bind(&args.address).await?;
    info!("GaleCache escutando em {}", args.address);

    run(listener, cache, shutdown_signal()).await;

    Ok(())
}

/// Completa no primeiro SIGINT ou SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).expect("instalar handler de SIGTERM");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
