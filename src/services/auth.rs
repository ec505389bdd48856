// src/services/auth.rs

use std::sync::Arc;
use std::time::Duration;

use bcrypt::verify;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError, config::AppConfig, db::SessionRepository,
    models::auth::{LoginOk, Session},
};

// Atraso fixo aplicado a toda falha de login: achata o canal lateral de
// tempo e segura força bruta.
const FAILED_LOGIN_DELAY: Duration = Duration::from_millis(500);

// Ciclo de vida dos tokens de sessão: credencial única de admin, token
// opaco UUID, expiração absoluta.
#[derive(Clone)]
pub struct AuthService {
    sessions: SessionRepository,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(sessions: SessionRepository, config: Arc<AppConfig>) -> Self {
        Self { sessions, config }
    }

    /// Valida contra a credencial fixa de admin. No sucesso, gera o token,
    /// persiste a sessão e aproveita a mesma chamada para varrer as sessões
    /// vencidas (limpeza amortizada, sem processo separado).
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOk, AppError> {
        let username_ok = username == self.config.admin_username;

        // A verificação do bcrypt é pesada; roda fora do executor async.
        let password_owned = password.to_owned();
        let hash = self.config.admin_password_hash.clone();
        let password_ok = tokio::task::spawn_blocking(move || verify(&password_owned, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !username_ok || !password_ok {
            tokio::time::sleep(FAILED_LOGIN_DELAY).await;
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        let purged = self.sessions.purge_expired(now).await?;
        if purged > 0 {
            tracing::debug!("{} sessões vencidas removidas no login", purged);
        }

        let session = Session {
            token: Uuid::new_v4().to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(self.config.session_hours),
        };
        self.sessions.insert(&session).await?;

        Ok(LoginOk {
            token: session.token,
            expires_in: self.config.session_hours * 3600,
        })
    }

    /// Token ausente, desconhecido ou vencido → false. Sessões vencidas NÃO
    /// são removidas aqui; só a varredura do login e o logout explícito
    /// apagam linhas.
    pub async fn validate(&self, token: Option<&str>) -> Result<bool, AppError> {
        let Some(token) = token else {
            return Ok(false);
        };
        let Some(session) = self.sessions.find(token).await? else {
            return Ok(false);
        };
        Ok(session.is_valid_at(Utc::now()))
    }

    /// Remove a sessão se existir; sempre sucede.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.sessions.delete(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRowStore, RowStore};
    use chrono::Duration as ChronoDuration;

    // Custo baixo só para os testes não pagarem o preço do hash de produção.
    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            admin_username: "admin".into(),
            admin_password_hash: bcrypt::hash("segredo", 4).unwrap(),
            session_hours: 24,
            owner_recipients: vec![],
            cache_ttl: Duration::from_secs(600),
            port: 0,
        })
    }

    fn service() -> (AuthService, SessionRepository, Arc<InMemoryRowStore>) {
        let store = Arc::new(InMemoryRowStore::new());
        let sessions = SessionRepository::new(store.clone());
        (
            AuthService::new(sessions.clone(), test_config()),
            sessions,
            store,
        )
    }

    #[tokio::test]
    async fn login_then_validate_then_logout() {
        let (auth, _, _) = service();

        let ok = auth.login("admin", "segredo").await.unwrap();
        assert_eq!(ok.expires_in, 24 * 3600);
        assert!(auth.validate(Some(&ok.token)).await.unwrap());

        auth.logout(&ok.token).await.unwrap();
        assert!(!auth.validate(Some(&ok.token)).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_credentials_twice_never_create_a_session() {
        let (auth, _, store) = service();

        for _ in 0..2 {
            let err = auth.login("admin", "errada").await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
        let err = auth.login("intruso", "segredo").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        assert!(store.scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_and_unknown_tokens_are_invalid() {
        let (auth, _, _) = service();
        assert!(!auth.validate(None).await.unwrap());
        assert!(!auth.validate(Some("inventado")).await.unwrap());
    }

    #[tokio::test]
    async fn expired_session_never_authorizes_and_stays_until_sweep() {
        let (auth, sessions, store) = service();

        let now = Utc::now();
        sessions
            .insert(&Session {
                token: "velha".into(),
                created_at: now - ChronoDuration::hours(48),
                expires_at: now - ChronoDuration::hours(24),
            })
            .await
            .unwrap();

        // validate não apaga a linha, só nega.
        assert!(!auth.validate(Some("velha")).await.unwrap());
        assert_eq!(store.scan().await.unwrap().len(), 1);

        // A varredura do próximo login apaga.
        let ok = auth.login("admin", "segredo").await.unwrap();
        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, ok.token);
    }
}
