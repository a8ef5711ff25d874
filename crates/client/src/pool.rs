use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::Mutex;
use tokio::time::{interval, timeout};
use tracing::debug;

use gale_common::{
    ConnectionError, DEFAULT_MAX_CONNS, DEFAULT_MAX_IDLE_CONNS, DEFAULT_WAIT_TIMEOUT,
    IDLE_MAX_AGE, IDLE_REAP_INTERVAL, INITIAL_BUFFER_CAPACITY, PoolError, ProtocolError,
    unix_now,
};
use gale_protocol::Frame;

/// Configuração do pool de conexões.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Teto de conexões dialed e ainda não fechadas (idle ou emprestadas).
    pub max_conns: usize,
    /// A partir deste total em voo, o reaper fecha conexões idle velhas.
    pub max_idle_conns: usize,
    /// Tempo máximo de espera por uma conexão devolvida.
    pub wait_timeout: Duration,
    /// Período de varredura do reaper.
    pub reap_interval: Duration,
    /// Idade de `last_used` a partir da qual uma idle é considerada velha.
    pub idle_max_age: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_conns: DEFAULT_MAX_CONNS,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            reap_interval: IDLE_REAP_INTERVAL,
            idle_max_age: IDLE_MAX_AGE,
        }
    }
}

struct Shared {
    address: String,
    config: PoolConfig,
    /// Conexões dialed e não fechadas. Admissão é por este contador, não
    /// pela capacidade do canal.
    in_flight: AtomicUsize,
    closed: AtomicBool,
    idle_tx: mpsc::Sender<PoolConn>,
    idle_rx: Mutex<mpsc::Receiver<PoolConn>>,
}

/// Pool de conexões TCP reutilizáveis, seguro para uso concorrente.
///
/// O canal de idle é a única primitiva de coordenação; contadores e flags
/// são atômicos. Uma task de fundo recolhe conexões idle velhas.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    pub fn new(address: impl Into<String>, config: PoolConfig) -> Pool {
        let (idle_tx, idle_rx) = mpsc::channel(config.max_conns.max(1));
        let shared = Arc::new(Shared {
            address: address.into(),
            config,
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            idle_tx,
            idle_rx: Mutex::new(idle_rx),
        });

        tokio::spawn(reap_idle(Arc::clone(&shared)));

        Pool { shared }
    }

    /// Pega uma conexão: idle se houver, nova se o teto permitir, senão
    /// espera `wait_timeout` por uma devolução.
    pub async fn get(&self) -> Result<PoolConn, PoolError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        {
            let mut rx = self.shared.idle_rx.lock().await;
            match rx.try_recv() {
                Ok(conn) => return Ok(conn),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Err(PoolError::Closed),
            }
        }

        let new_count = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        if new_count < self.shared.config.max_conns {
            match TcpStream::connect(&self.shared.address).await {
                Ok(stream) => return Ok(PoolConn::new(stream)),
                Err(e) => {
                    self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                    return Err(PoolError::Io(e));
                }
            }
        }
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        let taken = timeout(self.shared.config.wait_timeout, async {
            let mut rx = self.shared.idle_rx.lock().await;
            rx.recv().await
        })
        .await;

        match taken {
            Err(_) => Err(PoolError::Exhausted),
            Ok(None) => Err(PoolError::Closed),
            Ok(Some(conn)) => Ok(conn),
        }
    }

    /// Devolve uma conexão ao pool. Com o pool fechado (ou a fila cheia) a
    /// conexão é fechada em vez de re-enfileirada.
    pub async fn put(&self, conn: PoolConn) {
        if self.shared.closed.load(Ordering::SeqCst) {
            self.remove(conn);
            return;
        }
        match self.shared.idle_tx.try_send(conn) {
            Ok(()) => {}
            Err(TrySendError::Full(conn)) | Err(TrySendError::Closed(conn)) => {
                self.remove(conn);
            }
        }
    }

    /// Descarta uma conexão: decrementa o contador em voo e fecha o socket.
    pub fn remove(&self, conn: PoolConn) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        drop(conn);
    }

    /// Fecha o pool: nenhuma conexão nova é entregue, as idle são fechadas
    /// e devoluções futuras fecham o socket.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut rx = self.shared.idle_rx.lock().await;
        while let Ok(conn) = rx.try_recv() {
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            drop(conn);
        }
        rx.close();
    }

    /// Conexões dialed e não fechadas (idle + emprestadas).
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

/// Task de fundo que recolhe conexões idle velhas.
///
/// A cada tick examina uma conexão da fila: se o último uso é recente ela
/// volta para a fila; se é velha e o total em voo está no teto de idle, o
/// socket é fechado.
async fn reap_idle(shared: Arc<Shared>) {
    let mut ticker = interval(shared.config.reap_interval);
    // o primeiro tick de interval() completa imediatamente
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if shared.closed.load(Ordering::SeqCst) {
            return;
        }

        let conn = {
            let mut rx = shared.idle_rx.lock().await;
            match rx.try_recv() {
                Ok(conn) => conn,
                Err(TryRecvError::Empty) => continue,
                Err(TryRecvError::Disconnected) => return,
            }
        };

        let cutoff = unix_now().saturating_sub(shared.config.idle_max_age.as_secs() as u32);
        let stale = conn.last_used() < cutoff;

        if stale && shared.in_flight.load(Ordering::SeqCst) >= shared.config.max_idle_conns {
            debug!("conexão idle velha fechada pelo reaper");
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            drop(conn);
            continue;
        }

        match shared.idle_tx.try_send(conn) {
            Ok(()) => {}
            Err(TrySendError::Full(conn)) | Err(TrySendError::Closed(conn)) => {
                shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                drop(conn);
            }
        }
    }
}

/// Conexão poolada: socket bufferizado + instante do último uso.
///
/// Leituras e escritas bem-sucedidas atualizam `last_used` para o segundo
/// Unix corrente; o reaper decide por esse carimbo.
pub struct PoolConn {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
    last_used: AtomicU32,
}

impl PoolConn {
    fn new(stream: TcpStream) -> PoolConn {
        PoolConn {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            last_used: AtomicU32::new(unix_now()),
        }
    }

    pub fn last_used(&self) -> u32 {
        self.last_used.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.last_used.store(unix_now(), Ordering::SeqCst);
    }

    /// Escreve um frame de request e dá flush.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        self.touch();
        Ok(())
    }

    /// Lê um frame de resposta completo.
    pub async fn read_frame(&mut self) -> Result<Frame, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                self.touch();
                return Ok(frame);
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut cursor) {
            Ok(()) => {
                let len = cursor.position() as usize;
                cursor.set_position(0);
                let frame = Frame::parse(&mut cursor)?;
                self.buffer.advance(len);
                Ok(Some(frame))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(ConnectionError::Protocol(e)),
        }
    }
}
