use bytes::Bytes;

use gale_common::ClientError;
use gale_protocol::{Frame, Item, OpCode, Status, Value, parse_keys};

use crate::pool::{Pool, PoolConfig};

/// Cliente do GaleCache: um método por operação do protocolo.
///
/// Cada chamada pega uma conexão do pool, faz um request/response e devolve
/// a conexão. Falha de I/O descarta a conexão em vez de devolvê-la.
#[derive(Clone)]
pub struct Client {
    pool: Pool,
}

impl Client {
    /// Cria um cliente com os defaults do pool (10 conexões, 5 idle,
    /// espera de 100 ms).
    pub fn new(address: impl Into<String>) -> Client {
        Client::with_config(address, PoolConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: PoolConfig) -> Client {
        Client {
            pool: Pool::new(address, config),
        }
    }

    /// Insere um valor com expiração absoluta (segundos Unix).
    pub async fn add(&self, key: &str, value: Value) -> Result<(), ClientError> {
        let payload = Item::new(key, value).encode()?;
        self.rpc(Frame::request(OpCode::Set, payload)).await?;
        Ok(())
    }

    /// Busca um valor. `ClientError::NotFound` para chave ausente ou
    /// expirada.
    pub async fn get(&self, key: &str) -> Result<Value, ClientError> {
        let request = Frame::request(OpCode::Get, Bytes::copy_from_slice(key.as_bytes()));
        let payload = self.rpc(request).await?;
        let item = Item::parse(&payload)?;
        Ok(item.value)
    }

    /// Remove uma chave; sem erro se ausente.
    pub async fn remove(&self, key: &str) -> Result<(), ClientError> {
        let request = Frame::request(OpCode::Del, Bytes::copy_from_slice(key.as_bytes()));
        self.rpc(request).await?;
        Ok(())
    }

    /// Snapshot das chaves armazenadas no servidor.
    pub async fn keys(&self) -> Result<Vec<String>, ClientError> {
        let payload = self.rpc(Frame::request(OpCode::GetKeys, Bytes::new())).await?;
        Ok(parse_keys(&payload)?)
    }

    /// Fecha o pool; chamadas subsequentes falham com pool fechado.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn rpc(&self, request: Frame) -> Result<Bytes, ClientError> {
        let mut conn = self.pool.get().await?;

        if let Err(e) = conn.write_frame(&request).await {
            self.pool.remove(conn);
            return Err(e.into());
        }
        let response = match conn.read_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                self.pool.remove(conn);
                return Err(e.into());
            }
        };
        self.pool.put(conn).await;

        match Status::from_u8(response.code) {
            Some(Status::Success) => Ok(response.payload),
            Some(Status::NotFound) => Err(ClientError::NotFound),
            _ => Err(ClientError::Server(
                String::from_utf8_lossy(&response.payload).into_owned(),
            )),
        }
    }
}
