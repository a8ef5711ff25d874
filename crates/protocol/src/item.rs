use bytes::{Buf, BufMut, Bytes, BytesMut};
use gale_common::{ITEM_HEADER_SIZE, MAX_KEY_SIZE, ProtocolError};

/// Valor armazenado: instante de expiração + payload opaco.
///
/// `expired` é um instante absoluto em segundos Unix (UTC) truncado para
/// u32. O cache não interpreta o payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub expired: u32,
    pub data: Bytes,
}

impl Value {
    pub fn new(expired: u32, data: impl Into<Bytes>) -> Value {
        Value {
            expired,
            data: data.into(),
        }
    }

    /// Verdadeiro quando `now` alcançou ou passou a expiração.
    pub fn is_expired(&self, now: u32) -> bool {
        now >= self.expired
    }
}

/// Corpo de item: payload de requests Set e de responses Get com sucesso.
///
/// Layout big-endian: u32 expiração, u16 tamanho da chave, u32 tamanho do
/// valor, bytes da chave, bytes do valor.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub key: String,
    pub value: Value,
}

impl Item {
    pub fn new(key: impl Into<String>, value: Value) -> Item {
        Item {
            key: key.into(),
            value,
        }
    }

    /// Encoda o item. Falha se a chave não cabe no u16 do wire.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        if self.key.len() > MAX_KEY_SIZE {
            return Err(ProtocolError::KeyTooLong(self.key.len()));
        }
        let mut buf =
            BytesMut::with_capacity(ITEM_HEADER_SIZE + self.key.len() + self.value.data.len());
        buf.put_u32(self.value.expired);
        buf.put_u16(self.key.len() as u16);
        buf.put_u32(self.value.data.len() as u32);
        buf.put(self.key.as_bytes());
        buf.put(self.value.data.as_ref());
        Ok(buf.freeze())
    }

    /// Faz o parse de um corpo de item. O restante após o header precisa ter
    /// exatamente `key_len + value_len` bytes.
    pub fn parse(data: &[u8]) -> Result<Item, ProtocolError> {
        if data.len() < ITEM_HEADER_SIZE {
            return Err(ProtocolError::ItemSizeTooSmall);
        }
        let mut cur = data;
        let expired = cur.get_u32();
        let key_len = cur.get_u16() as usize;
        let value_len = cur.get_u32() as usize;

        if cur.remaining() != key_len + value_len {
            return Err(ProtocolError::ItemSizeTooSmall);
        }

        let key = String::from_utf8(cur[..key_len].to_vec())
            .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
        cur.advance(key_len);
        let value = Value {
            expired,
            data: Bytes::copy_from_slice(cur),
        };
        Ok(Item { key, value })
    }
}

/// Encoda a lista de chaves: u64 quantidade, depois u16 tamanho + bytes por
/// chave.
pub fn encode_keys(keys: &[String]) -> Bytes {
    let total: usize = keys.iter().map(|k| 2 + k.len()).sum();
    let mut buf = BytesMut::with_capacity(8 + total);
    buf.put_u64(keys.len() as u64);
    for key in keys {
        buf.put_u16(key.len() as u16);
        buf.put(key.as_bytes());
    }
    buf.freeze()
}

/// Decoda a lista de chaves de uma response GetKeys.
pub fn parse_keys(data: &[u8]) -> Result<Vec<String>, ProtocolError> {
    let mut cur = data;
    if cur.remaining() < 8 {
        return Err(ProtocolError::KeysPayloadTruncated);
    }
    let count = cur.get_u64() as usize;

    // o count vem do wire; não usar direto como capacidade
    let mut keys = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        if cur.remaining() < 2 {
            return Err(ProtocolError::KeysPayloadTruncated);
        }
        let len = cur.get_u16() as usize;
        if cur.remaining() < len {
            return Err(ProtocolError::KeysPayloadTruncated);
        }
        let key = String::from_utf8(cur[..len].to_vec())
            .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
        cur.advance(len);
        keys.push(key);
    }
    Ok(keys)
}
