// src/services/projector.rs

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, Row, RowStore},
    models::customer::Customer,
    models::index::{IndexEntry, IndexSnapshot},
};

pub const INDEX_KIND: &str = "INDEX";

// Projeta o conjunto de clientes na tabela secundária de listagem. O
// refresh é sempre integral: limpa e regrava tudo. A projeção é dado
// derivado e pode ser refeita do zero a qualquer momento.
#[derive(Clone)]
pub struct IndexProjector {
    customers: CustomerRepository,
    index_store: Arc<dyn RowStore>,
}

impl IndexProjector {
    pub fn new(customers: CustomerRepository, index_store: Arc<dyn RowStore>) -> Self {
        Self {
            customers,
            index_store,
        }
    }

    /// Scan completo dos clientes, derivação das entradas e sobrescrita
    /// integral da tabela secundária. Clientes com blob ilegível ficam de
    /// fora do índice (o repositório já os pulou), nunca abortam o rebuild.
    pub async fn rebuild(&self) -> Result<IndexSnapshot, AppError> {
        let (with_positions, next_id) = self.customers.list_with_positions().await?;

        let entries: Vec<IndexEntry> = with_positions
            .into_iter()
            .map(|(row, customer)| project(&customer, row))
            .collect();

        let mut rows = Vec::with_capacity(entries.len());
        for entry in &entries {
            rows.push(Row::new(
                entry.id.to_string(),
                INDEX_KIND,
                serde_json::to_string(entry)?,
            ));
        }
        self.index_store.replace_all(rows).await?;

        tracing::debug!("índice reconstruído com {} entradas", entries.len());
        Ok(IndexSnapshot {
            customers: entries,
            next_id,
        })
    }
}

// Deriva a entrada leve de um cliente. Campos opcionais ausentes viram
// string vazia; os campos de AMC continuam ausentes quando não há valor.
fn project(customer: &Customer, row: usize) -> IndexEntry {
    IndexEntry {
        id: customer.id,
        name: customer.name.clone(),
        phone: customer.phone.clone().unwrap_or_default(),
        address: customer.address.clone().unwrap_or_default(),
        ro_model: customer.ro_model.clone().unwrap_or_default(),
        notes: customer.notes.clone().unwrap_or_default(),
        customer_type: customer.customer_type,
        amc_start: customer.amc_start.clone(),
        amc_end: customer.amc_end.clone(),
        amc_amount: customer.amc_amount,
        last_visit: last_visit(customer),
        pending_complaints: customer
            .services
            .iter()
            .filter(|s| s.is_pending_complaint())
            .count(),
        row,
    }
}

// Data do atendimento mais recente. Só substitui quando estritamente maior,
// então empates ficam com o atendimento mais antigo na ordem original;
// datas não parseáveis são ignoradas.
fn last_visit(customer: &Customer) -> Option<String> {
    let mut best: Option<(NaiveDate, &str)> = None;

    for service in &customer.services {
        let Some(raw) = service.date.as_deref() else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            continue;
        };
        if best.map_or(true, |(current, _)| date > current) {
            best = Some((date, raw));
        }
    }

    best.map(|(_, raw)| raw.to_string())
}
