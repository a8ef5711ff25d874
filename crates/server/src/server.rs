use std::future::Future;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

use gale_storage::Cache;

use crate::{handle_connection, Connection};

/// Roda o servidor no listener até o future de shutdown completar.
///
/// Cada conexão aceita vira uma task independente com seu receiver de
/// cancelamento e um clone do canal de término. No shutdown o accept loop
/// para primeiro; workers observam o cancelamento entre frames e o retorno
/// só acontece depois que todos terminarem.
pub async fn run(listener: TcpListener, cache: Cache, shutdown: impl Future) {
    let (notify_shutdown, _) = broadcast::channel::<()>(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel::<()>(1);

    tokio::select! {
        result = serve(&listener, &cache, &notify_shutdown, &shutdown_complete_tx) => {
            if let Err(e) = result {
                error!("erro ao aceitar conexão: {e}");
            }
        }
        _ = shutdown => {
            info!("shutdown signal recebido");
        }
    }

    // Sinalizar cancelamento aos workers e aguardar todos drenarem
    drop(notify_shutdown);
    drop(shutdown_complete_tx);
    let _ = shutdown_complete_rx.recv().await;
}

async fn serve(
    listener: &TcpListener,
    cache: &Cache,
    notify_shutdown: &broadcast::Sender<()>,
    shutdown_complete_tx: &mpsc::Sender<()>,
) -> std::io::Result<()> {
    loop {
        let (socket, addr) = listener.accept().await?;
        info!("nova conexão: {addr}");

        let cache = cache.clone();
        let mut shutdown_rx = notify_shutdown.subscribe();
        let shutdown_complete = shutdown_complete_tx.clone();

        tokio::spawn(async move {
            let conn = Connection::new(socket);
            if let Err(e) = handle_connection(conn, cache, &mut shutdown_rx).await {
                error!("erro na conexão {addr}: {e}");
            }
            info!("conexão encerrada: {addr}");
            drop(shutdown_complete);
        });
    }
}
