#![forbid(unsafe_code)]

mod error;

pub use error::*;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_ADDR: &str = "127.0.0.1:30003";
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Header de operação: u8 código + u32 tamanho do payload.
pub const OPERATION_HEADER_SIZE: usize = 5;
/// Header de item: u32 expiração + u16 tamanho da chave + u32 tamanho do valor.
pub const ITEM_HEADER_SIZE: usize = 10;
/// O wire carrega o tamanho da chave como u16.
pub const MAX_KEY_SIZE: usize = u16::MAX as usize;

pub const DEFAULT_MAX_CONNS: usize = 10;
pub const DEFAULT_MAX_IDLE_CONNS: usize = 5;
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(100);
pub const IDLE_REAP_INTERVAL: Duration = Duration::from_secs(5);
pub const IDLE_MAX_AGE: Duration = Duration::from_secs(5);

/// Instante atual em segundos Unix (UTC), truncado para u32.
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
