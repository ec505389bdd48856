// src/models/customer.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

// --- ENUMS ---

// Tipo de contrato do cliente. Quando o blob não traz o campo, assume AMC.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    #[default]
    Amc,
    Regular,
}

// --- CLIENTE (O Agregado) ---

// O cliente é persistido inteiro como um blob JSON em uma linha da planilha.
// Campos desconhecidos vindos do frontend precisam sobreviver ao ciclo
// ler/gravar, por isso o `flatten` no final.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    // id <= 0 significa "cliente novo": o repositório aloca o próximo id.
    #[serde(default)]
    pub id: i64,

    #[validate(length(min = 1, message = "required"))]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ro_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub customer_type: CustomerType,

    // Datas em formato ISO (YYYY-MM-DD); só fazem sentido quando o tipo é AMC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_amount: Option<f64>,

    // Histórico de atendimentos, na ordem de inserção.
    #[serde(default)]
    pub services: Vec<Service>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// --- ATENDIMENTO ---

// O id vem do frontend e pode ser número ou string; guardamos como `Value`
// para que a comparação na remoção funcione nos dois casos.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: Value,

    #[serde(rename = "type", default)]
    pub service_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    // Data ISO usada para ordenar por recência.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    // Reclamação ainda aberta: só o status literal "done" encerra.
    pub fn is_pending_complaint(&self) -> bool {
        self.service_type == "complaint" && self.status.as_deref() != Some("done")
    }
}
