// src/db/cache.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

// Limite por entrada do substrato de cache (100 KB). Valores maiores não
// são cacheados; o leitor simplesmente cai no caminho sem cache.
pub const MAX_ENTRY_BYTES: usize = 100 * 1024;

// Cache chave → valor serializado com expiração por entrada. `put` devolve
// `false` quando o valor excede o limite por entrada, para que o chamador
// possa contar descartes por tamanho em vez de engoli-los em silêncio.
#[async_trait]
pub trait TtlCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> bool;

    async fn remove_many(&self, keys: &[String]);
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

// Implementação em memória. A expiração é preguiçosa: entradas vencidas são
// removidas quando lidas.
#[derive(Clone)]
pub struct InMemoryTtlCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    max_entry_bytes: usize,
}

impl InMemoryTtlCache {
    pub fn new() -> Self {
        Self::with_max_entry_bytes(MAX_ENTRY_BYTES)
    }

    pub fn with_max_entry_bytes(max_entry_bytes: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entry_bytes,
        }
    }
}

impl Default for InMemoryTtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtlCache for InMemoryTtlCache {
    async fn get(&self, key: &str) -> Option<String> {
        let Ok(mut entries) = self.entries.write() else {
            return None;
        };

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> bool {
        if value.len() > self.max_entry_bytes {
            return false;
        }

        let Ok(mut entries) = self.entries.write() else {
            return false;
        };

        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        true
    }

    async fn remove_many(&self, keys: &[String]) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        for key in keys {
            entries.remove(key);
        }
    }
}
