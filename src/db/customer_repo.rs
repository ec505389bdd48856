// src/db/customer_repo.rs

use std::sync::Arc;

use serde_json::Value;

use crate::{
    common::error::AppError,
    db::row_store::{Row, RowStore},
    models::customer::{Customer, Service},
};

// Discriminador de tipo das linhas de cliente. Hoje é o único tipo gravado
// na tabela primária; a coluna existe para permitir co-locar outros tipos
// de registro no futuro.
pub const CUSTOMER_KIND: &str = "CUSTOMER";

// Resultado de um upsert: a linha já existia ou foi acrescentada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Updated => "updated",
        }
    }
}

// O repositório de clientes: dono dos registros autoritativos e da alocação
// de ids. Cada cliente ocupa exatamente uma linha; toda mutação reescreve o
// blob inteiro.
#[derive(Clone)]
pub struct CustomerRepository {
    store: Arc<dyn RowStore>,
}

impl CustomerRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Scan completo. Linhas individualmente corrompidas são puladas (um
    /// registro ruim nunca derruba a listagem); `next_id` é calculado sobre
    /// as linhas que parsearam, começando em 1.
    pub async fn list_all(&self) -> Result<(Vec<Customer>, i64), AppError> {
        let (with_positions, next_id) = self.list_with_positions().await?;
        let customers = with_positions.into_iter().map(|(_, c)| c).collect();
        Ok((customers, next_id))
    }

    /// Igual a `list_all`, mas cada cliente vem com a posição física da sua
    /// linha no armazenamento primário (usada pela projeção do índice).
    pub async fn list_with_positions(&self) -> Result<(Vec<(usize, Customer)>, i64), AppError> {
        let rows = self.store.scan().await?;
        let mut customers = Vec::new();
        let mut next_id: i64 = 1;

        for (position, row) in rows.iter().enumerate() {
            if row.kind != CUSTOMER_KIND {
                continue;
            }
            match serde_json::from_str::<Customer>(&row.payload) {
                Ok(customer) => {
                    if customer.id >= next_id {
                        next_id = customer.id + 1;
                    }
                    customers.push((position, customer));
                }
                Err(err) => {
                    tracing::warn!("linha de cliente ilegível (chave {}): {}", row.key, err);
                }
            }
        }

        Ok((customers, next_id))
    }

    /// Próximo id livre, estritamente maior que todos os ids presentes.
    pub async fn next_id(&self) -> Result<i64, AppError> {
        Ok(self.list_all().await?.1)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Customer>, AppError> {
        Ok(self.find_row(id).await?.map(|(_, customer)| customer))
    }

    /// Insere ou atualiza. Linha existente é sobrescrita no lugar (posição
    /// preservada); caso contrário o cliente vira uma linha nova no fim.
    /// O scan e a escrita não são atômicos entre si: dois escritores
    /// concorrentes no mesmo id ficam em last-write-wins.
    pub async fn upsert(&self, customer: &Customer) -> Result<UpsertOutcome, AppError> {
        let payload = serde_json::to_string(customer)?;

        if let Some((position, _)) = self.find_row(customer.id).await? {
            self.store.update_payload(position, payload).await?;
            return Ok(UpsertOutcome::Updated);
        }

        self.store
            .append(Row::new(customer.id.to_string(), CUSTOMER_KIND, payload))
            .await?;
        Ok(UpsertOutcome::Inserted)
    }

    /// Remove a linha do cliente. O scan é de trás para frente, para que o
    /// deslocamento de posições causado por uma remoção nunca invalide as
    /// posições ainda não visitadas. Devolve `false` se o id não existe.
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let rows = self.store.scan().await?;
        let key = id.to_string();

        for (position, row) in rows.iter().enumerate().rev() {
            if row.kind == CUSTOMER_KIND && row.key == key {
                self.store.delete(position).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Acrescenta um atendimento à lista do cliente (append puro: sem dedup
    /// por id, sem ordenação) e reescreve o blob. `false` se o cliente não
    /// existe.
    pub async fn append_service(&self, customer_id: i64, service: Service) -> Result<bool, AppError> {
        let Some((position, mut customer)) = self.find_row(customer_id).await? else {
            return Ok(false);
        };

        customer.services.push(service);
        self.store
            .update_payload(position, serde_json::to_string(&customer)?)
            .await?;
        Ok(true)
    }

    /// Remove da lista todo atendimento cujo id bate com o dado. Remover um
    /// id inexistente é no-op com sucesso (o filtro devolve a mesma lista).
    pub async fn remove_service(&self, customer_id: i64, service_id: &Value) -> Result<bool, AppError> {
        let Some((position, mut customer)) = self.find_row(customer_id).await? else {
            return Ok(false);
        };

        customer.services.retain(|s| s.id != *service_id);
        self.store
            .update_payload(position, serde_json::to_string(&customer)?)
            .await?;
        Ok(true)
    }

    // Primeira (e única, pelo invariante) linha com o id dado, já parseada.
    async fn find_row(&self, id: i64) -> Result<Option<(usize, Customer)>, AppError> {
        let rows = self.store.scan().await?;
        let key = id.to_string();

        for (position, row) in rows.iter().enumerate() {
            if row.kind == CUSTOMER_KIND && row.key == key {
                let customer = serde_json::from_str::<Customer>(&row.payload)?;
                return Ok(Some((position, customer)));
            }
        }
        Ok(None)
    }
}
