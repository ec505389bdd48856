// src/models/index.rs

use serde::{Deserialize, Serialize};

use crate::models::customer::CustomerType;

// --- ENTRADA DO ÍNDICE (Dado derivado) ---

// Projeção leve de um cliente para a listagem rápida. Nunca é fonte de
// verdade: pode ser descartada e reconstruída a qualquer momento a partir
// das linhas primárias.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: i64,
    pub name: String,

    // Campos ausentes no blob de origem viram string vazia.
    pub phone: String,
    pub address: String,
    pub ro_model: String,
    pub notes: String,

    pub customer_type: CustomerType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_amount: Option<f64>,

    // Data do atendimento mais recente (ausente se não houver nenhum com
    // data parseável).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<String>,

    // Reclamações com status diferente de "done".
    pub pending_complaints: usize,

    // Posição física da linha do cliente no armazenamento primário, para
    // lookup O(1) futuro sem novo scan.
    pub row: usize,
}

// Retorno da projeção completa: a lista derivada mais o próximo id livre.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub customers: Vec<IndexEntry>,
    pub next_id: i64,
}
