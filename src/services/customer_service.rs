// src/services/customer_service.rs

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, TtlCache, UpsertOutcome},
    models::customer::{Customer, Service},
    models::index::IndexSnapshot,
    services::projector::IndexProjector,
};

const INDEX_CACHE_KEY: &str = "index";

fn customer_cache_key(id: i64) -> String {
    format!("customer_{id}")
}

// Fachada de leitura/escrita sobre o repositório e a projeção, com cache
// read-through. Não é dona de dado nenhum, só do prazo de frescor que os
// chamadores enxergam. O contrato de invalidação é exato: toda mutação no
// cliente X derruba "index" e "customer_X", nada além disso.
#[derive(Clone)]
pub struct CustomerService {
    repo: CustomerRepository,
    projector: IndexProjector,
    cache: Arc<dyn TtlCache>,
    cache_ttl: Duration,
}

impl CustomerService {
    pub fn new(
        repo: CustomerRepository,
        projector: IndexProjector,
        cache: Arc<dyn TtlCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            projector,
            cache,
            cache_ttl,
        }
    }

    /// Listagem leve: valor cacheado se ainda fresco, senão rebuild da
    /// projeção (com next_id derivado junto), grava com TTL e devolve.
    pub async fn get_index(&self) -> Result<IndexSnapshot, AppError> {
        if let Some(raw) = self.cache.get(INDEX_CACHE_KEY).await {
            // Entrada ilegível conta como miss e cai no rebuild.
            if let Ok(snapshot) = serde_json::from_str::<IndexSnapshot>(&raw) {
                return Ok(snapshot);
            }
        }

        let snapshot = self.projector.rebuild().await?;
        self.cache_put(INDEX_CACHE_KEY, &serde_json::to_string(&snapshot)?)
            .await;
        Ok(snapshot)
    }

    /// Registro completo, cache-first.
    pub async fn get_customer(&self, id: i64) -> Result<Customer, AppError> {
        let key = customer_cache_key(id);

        if let Some(raw) = self.cache.get(&key).await {
            if let Ok(customer) = serde_json::from_str::<Customer>(&raw) {
                return Ok(customer);
            }
        }

        let customer = self
            .repo
            .get(id)
            .await?
            .ok_or(AppError::CustomerNotFound)?;
        self.cache_put(&key, &serde_json::to_string(&customer)?).await;
        Ok(customer)
    }

    /// Listagem completa, sem cache (os agregados inteiros são grandes e o
    /// caminho é raro).
    pub async fn get_all(&self) -> Result<(Vec<Customer>, i64), AppError> {
        self.repo.list_all().await
    }

    /// Upsert do agregado. Cliente sem id (id <= 0) recebe o próximo id
    /// livre antes de gravar.
    pub async fn save_customer(&self, mut customer: Customer) -> Result<UpsertOutcome, AppError> {
        if customer.id <= 0 {
            customer.id = self.repo.next_id().await?;
        }

        let outcome = self.repo.upsert(&customer).await?;
        self.invalidate(customer.id).await;
        Ok(outcome)
    }

    pub async fn delete_customer(&self, id: i64) -> Result<bool, AppError> {
        let found = self.repo.delete(id).await?;
        if found {
            self.invalidate(id).await;
        }
        Ok(found)
    }

    pub async fn save_service(&self, customer_id: i64, service: Service) -> Result<bool, AppError> {
        let found = self.repo.append_service(customer_id, service).await?;
        if found {
            self.invalidate(customer_id).await;
        }
        Ok(found)
    }

    pub async fn delete_service(
        &self,
        customer_id: i64,
        service_id: &Value,
    ) -> Result<bool, AppError> {
        let found = self.repo.remove_service(customer_id, service_id).await?;
        if found {
            self.invalidate(customer_id).await;
        }
        Ok(found)
    }

    // Derruba exatamente as chaves afetadas pela mutação no cliente `id`.
    async fn invalidate(&self, id: i64) {
        self.cache
            .remove_many(&[INDEX_CACHE_KEY.to_string(), customer_cache_key(id)])
            .await;
    }

    // Escrita no cache de melhor esforço: valor grande demais não é
    // cacheado e a próxima leitura cai no caminho sem cache.
    async fn cache_put(&self, key: &str, raw: &str) {
        if !self.cache.put(key, raw, self.cache_ttl).await {
            tracing::debug!("valor de '{}' excede o limite do cache, não cacheado", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryRowStore, InMemoryTtlCache};
    use serde_json::json;

    fn setup_with_cache(cache: Arc<dyn TtlCache>) -> (CustomerService, CustomerRepository) {
        let primary = Arc::new(InMemoryRowStore::new());
        let index = Arc::new(InMemoryRowStore::new());
        let repo = CustomerRepository::new(primary);
        let projector = IndexProjector::new(repo.clone(), index);
        (
            CustomerService::new(
                repo.clone(),
                projector,
                cache,
                Duration::from_secs(600),
            ),
            repo,
        )
    }

    fn setup() -> (CustomerService, CustomerRepository) {
        setup_with_cache(Arc::new(InMemoryTtlCache::new()))
    }

    fn customer(id: i64, name: &str) -> Customer {
        Customer {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn index_read_is_served_from_cache_within_ttl() {
        let (service, repo) = setup();
        service.save_customer(customer(1, "Ana")).await.unwrap();

        let first = service.get_index().await.unwrap();
        assert_eq!(first.customers.len(), 1);

        // Mutação por fora da fachada: o cache não fica sabendo e a leitura
        // seguinte ainda enxerga o valor antigo (janela de staleness do TTL).
        repo.upsert(&customer(2, "Bruno")).await.unwrap();
        let second = service.get_index().await.unwrap();
        assert_eq!(second.customers.len(), 1);
    }

    #[tokio::test]
    async fn every_mutation_is_visible_on_the_next_read() {
        let (service, _) = setup();

        service.save_customer(customer(1, "Ana")).await.unwrap();
        assert_eq!(service.get_index().await.unwrap().customers.len(), 1);

        // upsert
        service.save_customer(customer(2, "Bruno")).await.unwrap();
        let snapshot = service.get_index().await.unwrap();
        assert_eq!(snapshot.customers.len(), 2);
        assert_eq!(snapshot.next_id, 3);

        // saveService
        let svc = Service {
            id: json!(1),
            service_type: "complaint".into(),
            status: Some("open".into()),
            ..Default::default()
        };
        service.save_service(2, svc).await.unwrap();
        let snapshot = service.get_index().await.unwrap();
        assert_eq!(snapshot.customers[1].pending_complaints, 1);
        assert_eq!(service.get_customer(2).await.unwrap().services.len(), 1);

        // deleteService
        service.delete_service(2, &json!(1)).await.unwrap();
        assert_eq!(
            service.get_index().await.unwrap().customers[1].pending_complaints,
            0
        );

        // delete
        service.delete_customer(1).await.unwrap();
        let snapshot = service.get_index().await.unwrap();
        assert_eq!(snapshot.customers.len(), 1);
        assert!(matches!(
            service.get_customer(1).await.unwrap_err(),
            AppError::CustomerNotFound
        ));
    }

    #[tokio::test]
    async fn get_customer_prefers_the_cache() {
        let (service, repo) = setup();
        service.save_customer(customer(1, "Ana")).await.unwrap();

        assert_eq!(service.get_customer(1).await.unwrap().name, "Ana");

        repo.upsert(&customer(1, "Trocada")).await.unwrap();
        // Ainda dentro do TTL e sem invalidação: vem do cache.
        assert_eq!(service.get_customer(1).await.unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn missing_customer_is_not_found() {
        let (service, _) = setup();
        assert!(matches!(
            service.get_customer(42).await.unwrap_err(),
            AppError::CustomerNotFound
        ));
    }

    #[tokio::test]
    async fn save_without_id_allocates_the_next_free_id() {
        let (service, _) = setup();
        service.save_customer(customer(4, "Ana")).await.unwrap();

        let outcome = service.save_customer(customer(0, "Bruno")).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let (customers, next_id) = service.get_all().await.unwrap();
        assert_eq!(customers[1].id, 5);
        assert_eq!(next_id, 6);
    }

    #[tokio::test]
    async fn oversized_entries_fall_back_to_the_uncached_path() {
        // Cache minúsculo: nada cabe, toda leitura vai ao armazenamento.
        let (service, repo) =
            setup_with_cache(Arc::new(InMemoryTtlCache::with_max_entry_bytes(4)));
        service.save_customer(customer(1, "Ana")).await.unwrap();

        assert_eq!(service.get_index().await.unwrap().customers.len(), 1);

        repo.upsert(&customer(2, "Bruno")).await.unwrap();
        // Sem entrada cacheada, a mutação externa aparece de imediato.
        assert_eq!(service.get_index().await.unwrap().customers.len(), 2);
    }

    #[tokio::test]
    async fn delete_of_missing_customer_reports_false() {
        let (service, _) = setup();
        assert!(!service.delete_customer(9).await.unwrap());
        assert!(!service.save_service(9, Service::default()).await.unwrap());
        assert!(!service.delete_service(9, &json!(1)).await.unwrap());
    }
}
