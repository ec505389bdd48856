// src/db/row_store.rs

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::common::error::AppError;

// Uma linha do armazenamento: chave externa, discriminador de tipo e o blob
// JSON com o registro inteiro (as colunas ID / TYPE / DATA da planilha).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub kind: String,
    pub payload: String,
}

impl Row {
    pub fn new(key: impl Into<String>, kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

// Tabela ordenada e abstrata de linhas. As mutações são endereçadas pela
// posição observada no último `scan`, a mesma semântica "escaneia e escreve
// na linha i" da planilha, incluindo a corrida aceita de last-write-wins.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn scan(&self) -> Result<Vec<Row>, AppError>;

    async fn append(&self, row: Row) -> Result<(), AppError>;

    /// Sobrescreve o payload da linha na posição dada, preservando a posição.
    async fn update_payload(&self, position: usize, payload: String) -> Result<(), AppError>;

    /// Remove a linha na posição dada; posições seguintes deslocam uma casa.
    async fn delete(&self, position: usize) -> Result<(), AppError>;

    /// Limpa a tabela e grava todas as linhas de uma vez (refresh integral
    /// da projeção secundária).
    async fn replace_all(&self, rows: Vec<Row>) -> Result<(), AppError>;
}

// Implementação em memória, guardada por RwLock. Clones compartilham o
// mesmo armazenamento via Arc.
#[derive(Clone, Default)]
pub struct InMemoryRowStore {
    rows: Arc<RwLock<Vec<Row>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> AppError {
    AppError::Storage("lock envenenado".into())
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn scan(&self) -> Result<Vec<Row>, AppError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.clone())
    }

    async fn append(&self, row: Row) -> Result<(), AppError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.push(row);
        Ok(())
    }

    async fn update_payload(&self, position: usize, payload: String) -> Result<(), AppError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let row = rows
            .get_mut(position)
            .ok_or_else(|| AppError::Storage(format!("posição {position} fora do intervalo")))?;
        row.payload = payload;
        Ok(())
    }

    async fn delete(&self, position: usize) -> Result<(), AppError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if position >= rows.len() {
            return Err(AppError::Storage(format!(
                "posição {position} fora do intervalo"
            )));
        }
        rows.remove(position);
        Ok(())
    }

    async fn replace_all(&self, new_rows: Vec<Row>) -> Result<(), AppError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        *rows = new_rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_scan() {
        let store = InMemoryRowStore::new();
        store.append(Row::new("1", "CUSTOMER", "{}")).await.unwrap();
        store.append(Row::new("2", "CUSTOMER", "{}")).await.unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "1");
        assert_eq!(rows[1].key, "2");
    }

    #[tokio::test]
    async fn update_payload_keeps_position() {
        let store = InMemoryRowStore::new();
        store.append(Row::new("1", "CUSTOMER", "a")).await.unwrap();
        store.append(Row::new("2", "CUSTOMER", "b")).await.unwrap();

        store.update_payload(0, "novo".into()).await.unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows[0].payload, "novo");
        assert_eq!(rows[1].payload, "b");
    }

    #[tokio::test]
    async fn delete_shifts_following_rows() {
        let store = InMemoryRowStore::new();
        store.append(Row::new("1", "CUSTOMER", "a")).await.unwrap();
        store.append(Row::new("2", "CUSTOMER", "b")).await.unwrap();
        store.append(Row::new("3", "CUSTOMER", "c")).await.unwrap();

        store.delete(1).await.unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].key, "3");
    }

    #[tokio::test]
    async fn out_of_range_positions_fail() {
        let store = InMemoryRowStore::new();
        assert!(store.update_payload(0, "x".into()).await.is_err());
        assert!(store.delete(0).await.is_err());
    }

    #[tokio::test]
    async fn replace_all_overwrites_everything() {
        let store = InMemoryRowStore::new();
        store.append(Row::new("1", "INDEX", "velho")).await.unwrap();

        store
            .replace_all(vec![
                Row::new("2", "INDEX", "novo"),
                Row::new("3", "INDEX", "novo"),
            ])
            .await
            .unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.payload == "novo"));
    }

    #[tokio::test]
    async fn clone_shares_storage() {
        let store = InMemoryRowStore::new();
        let clone = store.clone();
        store.append(Row::new("1", "CUSTOMER", "{}")).await.unwrap();
        assert_eq!(clone.scan().await.unwrap().len(), 1);
    }
}
