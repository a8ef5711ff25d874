use std::sync::{Arc, RwLock};

use gale_protocol::Value;

use crate::LruCache;

/// Handle compartilhado do cache, clonável entre workers.
///
/// `get` atualiza a ordem de recência, então adquire o lock de escrita
/// junto com `add` e `remove`; só `peek`, `keys` e `len` entram como
/// leitores. O lock cobre uma única operação LRU e nunca atravessa I/O.
#[derive(Debug, Clone)]
pub struct Cache {
    shared: Arc<RwLock<LruCache>>,
}

impl Cache {
    /// `max_entries == 0` significa sem limite.
    pub fn new(max_entries: usize) -> Cache {
        Cache {
            shared: Arc::new(RwLock::new(LruCache::new(max_entries))),
        }
    }

    pub fn add(&self, key: impl Into<String>, value: Value) {
        self.shared.write().unwrap().add(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.write().unwrap().get(key).cloned()
    }

    /// Leitura sem atualizar a recência.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.shared.read().unwrap().peek(key).cloned()
    }

    pub fn remove(&self, key: &str) {
        self.shared.write().unwrap().remove(key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.shared.read().unwrap().keys()
    }

    pub fn len(&self) -> usize {
        self.shared.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn value(data: &str) -> Value {
        Value::new(u32::MAX, Bytes::copy_from_slice(data.as_bytes()))
    }

    #[test]
    fn clones_share_state() {
        let cache = Cache::new(0);
        let other = cache.clone();
        cache.add("key", value("v"));
        assert_eq!(other.get("key").unwrap().data, Bytes::from("v"));
    }

    #[test]
    fn peek_returns_without_touching() {
        let cache = Cache::new(2);
        cache.add("a", value("1"));
        cache.add("b", value("2"));
        assert!(cache.peek("a").is_some());
        cache.add("c", value("3"));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn concurrent_adds_respect_bound() {
        let cache = Cache::new(50);
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    cache.add(format!("t{t}-k{i}"), value("v"));
                    cache.get(&format!("t{t}-k{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Cache::new(0);
        cache.add("shared", value("v"));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    cache.add(format!("k{i}"), value("v"));
                    assert!(cache.get("shared").is_some());
                    let _ = cache.keys();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 201);
    }
}
