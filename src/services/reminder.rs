// src/services/reminder.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::{
    common::error::AppError,
    db::CustomerRepository,
    models::customer::CustomerType,
};

// Janela de aviso: contratos que vencem de hoje até 7 dias adiante.
const WINDOW_DAYS: i64 = 7;

// Contrato dentro da janela de vencimento, já com os dias restantes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiringContract {
    pub customer_id: i64,
    pub name: String,
    pub phone: String,
    pub amc_end: String,
    pub days_left: i64,
}

// Entrega do digesto ao dono. A entrega em si (SMTP, template HTML) fica
// fora deste design; o colaborador recebe o texto pronto.
#[async_trait]
pub trait ReminderMailer: Send + Sync {
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), AppError>;
}

// Implementação padrão: registra o digesto no log.
pub struct TracingMailer;

#[async_trait]
impl ReminderMailer for TracingMailer {
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), AppError> {
        tracing::info!(
            "digesto de lembrete para {}: {}\n{}",
            recipients.join(", "),
            subject,
            body
        );
        Ok(())
    }
}

// Varredura diária dos contratos AMC a vencer. Sempre faz o scan completo
// direto no repositório, ignorando o cache.
#[derive(Clone)]
pub struct ReminderService {
    repo: CustomerRepository,
    mailer: Arc<dyn ReminderMailer>,
    recipients: Vec<String>,
}

impl ReminderService {
    pub fn new(
        repo: CustomerRepository,
        mailer: Arc<dyn ReminderMailer>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            repo,
            mailer,
            recipients,
        }
    }

    /// Filtra os clientes com contrato vencendo em `0..=7` dias a partir de
    /// `today`, em ordem crescente de dias restantes (empates mantêm a ordem
    /// do scan). Clientes `regular` e datas ilegíveis ficam de fora.
    pub async fn collect_expiring(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<ExpiringContract>, AppError> {
        let (customers, _) = self.repo.list_all().await?;
        let mut expiring = Vec::new();

        for customer in customers {
            if customer.customer_type == CustomerType::Regular {
                continue;
            }
            let Some(raw_end) = customer.amc_end.as_deref() else {
                continue;
            };
            let Ok(end) = NaiveDate::parse_from_str(raw_end, "%Y-%m-%d") else {
                continue;
            };

            let days_left = (end - today).num_days();
            if (0..=WINDOW_DAYS).contains(&days_left) {
                expiring.push(ExpiringContract {
                    customer_id: customer.id,
                    name: customer.name.clone(),
                    phone: customer.phone.clone().unwrap_or_default(),
                    amc_end: raw_end.to_string(),
                    days_left,
                });
            }
        }

        // sort_by_key é estável: empates preservam a ordem original.
        expiring.sort_by_key(|e| e.days_left);
        Ok(expiring)
    }

    /// Uma rodada do job. Conjunto vazio não envia nada (no-op, não é
    /// erro); senão manda um único digesto com todos os contratos.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let expiring = self.collect_expiring(Utc::now().date_naive()).await?;
        if expiring.is_empty() {
            return Ok(0);
        }

        let subject = format!("AquaTrack: {} contrato(s) AMC a vencer", expiring.len());
        let body = render_digest(&expiring);
        self.mailer
            .send_digest(&self.recipients, &subject, &body)
            .await?;

        Ok(expiring.len())
    }
}

fn render_digest(expiring: &[ExpiringContract]) -> String {
    let mut lines = Vec::with_capacity(expiring.len() + 1);
    lines.push("Contratos AMC vencendo nos próximos 7 dias:".to_string());
    for contract in expiring {
        let phone = if contract.phone.is_empty() {
            "sem telefone".to_string()
        } else {
            contract.phone.clone()
        };
        lines.push(format!(
            "- {} ({}): vence em {} dia(s), em {}",
            contract.name, phone, contract.days_left, contract.amc_end
        ));
    }
    lines.join("\n")
}
