// src/db/session_repo.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    db::row_store::{Row, RowStore},
    models::auth::Session,
};

pub const SESSION_KIND: &str = "SESSION";

// Repositório das sessões, sobre a tabela de sessões (token, expiresAt,
// createdAt). A chave da linha é o próprio token.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn RowStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, session: &Session) -> Result<(), AppError> {
        let payload = serde_json::to_string(session)?;
        self.store
            .append(Row::new(session.token.clone(), SESSION_KIND, payload))
            .await
    }

    pub async fn find(&self, token: &str) -> Result<Option<Session>, AppError> {
        let rows = self.store.scan().await?;
        for row in rows {
            if row.kind != SESSION_KIND || row.key != token {
                continue;
            }
            match serde_json::from_str::<Session>(&row.payload) {
                Ok(session) => return Ok(Some(session)),
                Err(err) => {
                    tracing::warn!("linha de sessão ilegível: {}", err);
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Remove a sessão do token, se existir. Idempotente.
    pub async fn delete(&self, token: &str) -> Result<(), AppError> {
        let rows = self.store.scan().await?;
        for (position, row) in rows.iter().enumerate().rev() {
            if row.kind == SESSION_KIND && row.key == token {
                self.store.delete(position).await?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Varre todas as sessões vencidas (e linhas ilegíveis) de uma vez.
    /// Remoção de trás para frente, para as posições restantes continuarem
    /// válidas durante a passada. Devolve quantas linhas saíram.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let rows = self.store.scan().await?;
        let mut purged = 0;

        for (position, row) in rows.iter().enumerate().rev() {
            if row.kind != SESSION_KIND {
                continue;
            }
            let expired = match serde_json::from_str::<Session>(&row.payload) {
                Ok(session) => !session.is_valid_at(now),
                Err(_) => true,
            };
            if expired {
                self.store.delete(position).await?;
                purged += 1;
            }
        }

        Ok(purged)
    }
}
