#![forbid(unsafe_code)]

mod client;
mod pool;

pub use client::Client;
pub use pool::{Pool, PoolConfig, PoolConn};
