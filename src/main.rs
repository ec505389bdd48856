// src/main.rs

use std::time::Duration;

use axum::{Router, routing::get};
use tokio::net::TcpListener;

mod common;
mod config;
mod db;
mod handlers;
mod models;
mod services;

use crate::config::{AppConfig, AppState};

// Intervalo do job de lembretes: uma rodada por dia. A primeira rodada sai
// na subida do processo.
const REMINDER_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let config = AppConfig::from_env().expect("Falha ao carregar a configuração.");
    let port = config.port;
    let app_state = AppState::new(config);

    // Job de lembretes, independente do ciclo de requisições.
    let reminder = app_state.reminder_service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REMINDER_INTERVAL);
        loop {
            ticker.tick().await;
            match reminder.run_once().await {
                Ok(0) => tracing::debug!("nenhum contrato AMC a vencer"),
                Ok(count) => tracing::info!("digesto enviado com {} contrato(s)", count),
                Err(err) => tracing::error!("job de lembretes falhou: {}", err),
            }
        }
    });

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api",
            get(handlers::api::handle_get).post(handlers::api::handle_post),
        )
        .with_state(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
