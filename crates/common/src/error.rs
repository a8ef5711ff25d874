/// Erros do codec binário. O texto viaja no wire como payload de frames
/// Error.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("incomplete frame")]
    Incomplete,
    #[error("frame exceeds maximum size ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("item size too small")]
    ItemSizeTooSmall,
    #[error("key too long ({0} bytes)")]
    KeyTooLong(usize),
    #[error("truncated keys payload")]
    KeysPayloadTruncated,
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("unsupported operation")]
    UnsupportedOperation,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Erros do pool de conexões do cliente.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool de conexões fechado")]
    Closed,
    #[error("todas as conexões em uso")]
    Exhausted,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros da API do cliente.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("entidade não encontrada")]
    NotFound,
    #[error("erro do servidor: {0}")]
    Server(String),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Erro top-level do GaleCache.
#[derive(Debug, thiserror::Error)]
pub enum GaleError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result type alias.
pub type GaleResult<T> = Result<T, GaleError>;

// Conversão implícita de io::Error → GaleError (via ConnectionError)
impl From<std::io::Error> for GaleError {
    fn from(e: std::io::Error) -> Self {
        GaleError::Connection(ConnectionError::Io(e))
    }
}
