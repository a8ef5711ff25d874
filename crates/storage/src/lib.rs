#![forbid(unsafe_code)]

mod cache;
mod lru;

pub use cache::Cache;
pub use lru::LruCache;
