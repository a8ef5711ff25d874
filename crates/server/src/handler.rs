use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::debug;

use gale_common::{ConnectionError, ProtocolError, unix_now};
use gale_protocol::{Frame, Item, OpCode, Status, encode_keys};
use gale_storage::Cache;

use crate::Connection;

/// Loop principal de tratamento de uma conexão: um frame de request entra,
/// um frame de response sai. O cancelamento é observado entre frames.
pub async fn handle_connection(
    mut conn: Connection,
    cache: Cache,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        debug!(
            code = frame.code,
            payload_len = frame.payload.len(),
            "request recebido"
        );

        let response = execute(&frame, &cache);
        conn.write_frame(&response).await?;
    }
}

/// Despacha uma operação contra o cache e monta o frame de resposta.
fn execute(request: &Frame, cache: &Cache) -> Frame {
    match OpCode::from(request.code) {
        OpCode::Get => get(&request.payload, cache),
        OpCode::Set => set(&request.payload, cache),
        OpCode::Del => del(&request.payload, cache),
        OpCode::GetKeys => get_keys(cache),
        OpCode::Unknown => Frame::response(
            Status::Error,
            Bytes::from(ProtocolError::UnsupportedOperation.to_string()),
        ),
    }
}

fn get(payload: &[u8], cache: &Cache) -> Frame {
    let key = String::from_utf8_lossy(payload);
    let value = match cache.get(&key) {
        Some(v) => v,
        None => return Frame::response(Status::NotFound, Bytes::new()),
    };

    // entradas expiradas ficam no cache até sobrescrita ou eviction
    if value.is_expired(unix_now()) {
        return Frame::response(Status::NotFound, Bytes::new());
    }

    match Item::new(key.into_owned(), value).encode() {
        Ok(body) => Frame::response(Status::Success, body),
        Err(e) => Frame::response(Status::Error, Bytes::from(e.to_string())),
    }
}

fn set(payload: &[u8], cache: &Cache) -> Frame {
    let item = match Item::parse(payload) {
        Ok(item) => item,
        Err(e) => return Frame::response(Status::Error, Bytes::from(e.to_string())),
    };

    // um write já expirado é aceito e descartado em silêncio
    if item.value.is_expired(unix_now()) {
        return Frame::response(Status::Success, Bytes::new());
    }

    cache.add(item.key, item.value);
    Frame::response(Status::Success, Bytes::new())
}

fn del(payload: &[u8], cache: &Cache) -> Frame {
    let key = String::from_utf8_lossy(payload);
    cache.remove(&key);
    Frame::response(Status::Success, Bytes::new())
}

fn get_keys(cache: &Cache) -> Frame {
    Frame::response(Status::Success, encode_keys(&cache.keys()))
}
