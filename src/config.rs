// src/config.rs

use std::sync::Arc;
use std::time::Duration;
use std::{env, str::FromStr};

use anyhow::Context;

use crate::{
    db::{CustomerRepository, InMemoryRowStore, InMemoryTtlCache, RowStore, SessionRepository, TtlCache},
    services::{AuthService, CustomerService, IndexProjector, ReminderService},
    services::reminder::TracingMailer,
};

// Configuração carregada uma única vez na subida do processo. A senha do
// admin entra como hash bcrypt, nunca em texto puro.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub admin_username: String,
    pub admin_password_hash: String,
    pub session_hours: i64,
    pub owner_recipients: Vec<String>,
    pub cache_ttl: Duration,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let admin_username =
            env::var("ADMIN_USERNAME").context("ADMIN_USERNAME deve ser definida")?;
        let admin_password_hash =
            env::var("ADMIN_PASSWORD_HASH").context("ADMIN_PASSWORD_HASH deve ser definida")?;

        let owner_recipients: Vec<String> = env::var("OWNER_RECIPIENTS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if owner_recipients.is_empty() {
            tracing::warn!("OWNER_RECIPIENTS vazio: o digesto de lembretes só sai no log");
        }

        Ok(Self {
            admin_username,
            admin_password_hash,
            session_hours: env_or("SESSION_HOURS", 24),
            owner_recipients,
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECONDS", 600)),
            port: env_or("PORT", 3000),
        })
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

// O estado compartilhado que será acessível em toda a aplicação.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub reminder_service: ReminderService,
}

impl AppState {
    // Monta o gráfico de dependências: três tabelas (primária, índice,
    // sessões), uma por aba da planilha, o cache TTL e os serviços por cima.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);

        let primary: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
        let index: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
        let sessions: Arc<dyn RowStore> = Arc::new(InMemoryRowStore::new());
        let cache: Arc<dyn TtlCache> = Arc::new(InMemoryTtlCache::new());

        let customer_repo = CustomerRepository::new(primary);
        let session_repo = SessionRepository::new(sessions);
        let projector = IndexProjector::new(customer_repo.clone(), index);

        let auth_service = AuthService::new(session_repo, config.clone());
        let customer_service = CustomerService::new(
            customer_repo.clone(),
            projector,
            cache,
            config.cache_ttl,
        );
        let reminder_service = ReminderService::new(
            customer_repo,
            Arc::new(TracingMailer),
            config.owner_recipients.clone(),
        );

        Self {
            config,
            auth_service,
            customer_service,
            reminder_service,
        }
    }
}
