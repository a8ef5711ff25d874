use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use gale_common::{MAX_FRAME_SIZE, OPERATION_HEADER_SIZE, ProtocolError};

/// Código de operação de um request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Unknown = 0,
    Set = 1,
    Get = 2,
    Del = 3,
    GetKeys = 4,
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        match byte {
            1 => OpCode::Set,
            2 => OpCode::Get,
            3 => OpCode::Del,
            4 => OpCode::GetKeys,
            _ => OpCode::Unknown,
        }
    }
}

/// Código de status de uma response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0xFF,
    Error = 0xFE,
    NotFound = 0xFD,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Status> {
        match byte {
            0xFF => Some(Status::Success),
            0xFE => Some(Status::Error),
            0xFD => Some(Status::NotFound),
            _ => None,
        }
    }
}

/// Um frame no wire: header de 5 bytes (código + tamanho do payload,
/// big-endian) seguido do payload. Requests e responses compartilham o
/// mesmo formato, só muda o significado do código.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub code: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn request(op: OpCode, payload: Bytes) -> Frame {
        Frame {
            code: op as u8,
            payload,
        }
    }

    pub fn response(status: Status, payload: Bytes) -> Frame {
        Frame {
            code: status as u8,
            payload,
        }
    }

    /// Verifica se um frame completo está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completo, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        if src.remaining() < OPERATION_HEADER_SIZE {
            return Err(ProtocolError::Incomplete);
        }
        src.advance(1);
        let len = src.get_u32() as usize;
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(len));
        }
        if src.remaining() < len {
            return Err(ProtocolError::Incomplete);
        }
        src.advance(len);
        Ok(())
    }

    /// Faz o parse de um frame completo a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        if src.remaining() < OPERATION_HEADER_SIZE {
            return Err(ProtocolError::Incomplete);
        }
        let code = src.get_u8();
        let len = src.get_u32() as usize;
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(len));
        }
        if src.remaining() < len {
            return Err(ProtocolError::Incomplete);
        }
        let start = src.position() as usize;
        let payload = Bytes::copy_from_slice(&src.get_ref()[start..start + len]);
        src.advance(len);
        Ok(Frame { code, payload })
    }

    /// Encoda o frame no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(OPERATION_HEADER_SIZE + self.payload.len());
        dst.put_u8(self.code);
        dst.put_u32(self.payload.len() as u32);
        dst.put(self.payload.as_ref());
    }
}
