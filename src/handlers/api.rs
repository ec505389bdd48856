// src/handlers/api.rs

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::LoginPayload,
    models::customer::{Customer, Service},
};

// A requisição única da API: um campo `action` seleciona o comportamento e
// os demais campos são opcionais conforme a ação. Aceita tanto query string
// quanto corpo JSON.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiRequest {
    pub action: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub customer: Option<Value>,
    pub customer_id: Option<i64>,
    pub service: Option<Value>,
    pub service_id: Option<Value>,
}

// GET /api (parâmetros de query)
pub async fn handle_get(
    State(app_state): State<AppState>,
    Query(request): Query<ApiRequest>,
) -> Result<Json<Value>, AppError> {
    dispatch(&app_state, request).await.map(Json)
}

// POST /api (corpo JSON). Corpo ilegível vira resposta JSON de erro em vez
// da rejeição em texto puro do axum.
pub async fn handle_post(
    State(app_state): State<AppState>,
    payload: Result<Json<ApiRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    dispatch(&app_state, request).await.map(Json)
}

// O despacho por ação. Toda ação menos `login` passa primeiro pelo portão
// de autenticação; só então a lógica de negócio roda.
pub(crate) async fn dispatch(state: &AppState, request: ApiRequest) -> Result<Value, AppError> {
    let action = request.action.clone().unwrap_or_default();

    if action != "login" {
        let authorized = state.auth_service.validate(request.token.as_deref()).await?;
        if !authorized {
            return Err(AppError::Unauthorized);
        }
    }

    match action.as_str() {
        "login" => {
            let payload = LoginPayload {
                username: request.username.unwrap_or_default(),
                password: request.password.unwrap_or_default(),
            };
            payload.validate()?;

            let ok = state
                .auth_service
                .login(&payload.username, &payload.password)
                .await?;
            Ok(json!({
                "success": true,
                "token": ok.token,
                "expiresIn": ok.expires_in,
            }))
        }

        "logout" => {
            // O portão acima já garantiu que o token existe e é válido.
            let token = request.token.as_deref().unwrap_or_default();
            state.auth_service.logout(token).await?;
            Ok(json!({ "success": true }))
        }

        "getIndex" => {
            let snapshot = state.customer_service.get_index().await?;
            Ok(serde_json::to_value(snapshot)?)
        }

        "getCustomer" => {
            let id = required_customer_id(&request)?;
            let customer = state.customer_service.get_customer(id).await?;
            Ok(json!({ "customer": customer }))
        }

        "getAll" => {
            let (customers, next_id) = state.customer_service.get_all().await?;
            Ok(json!({ "customers": customers, "nextId": next_id }))
        }

        "saveCustomer" => {
            let value = request
                .customer
                .ok_or_else(|| AppError::BadRequest("customer é obrigatório".into()))?;
            let customer: Customer = serde_json::from_value(value)
                .map_err(|e| AppError::BadRequest(format!("customer inválido: {e}")))?;
            customer.validate()?;

            let outcome = state.customer_service.save_customer(customer).await?;
            Ok(json!({ "success": true, "action": outcome.as_str() }))
        }

        "deleteCustomer" => {
            let id = required_customer_id(&request)?;
            let found = state.customer_service.delete_customer(id).await?;
            Ok(found_response(found))
        }

        "saveService" => {
            let id = required_customer_id(&request)?;
            let value = request
                .service
                .ok_or_else(|| AppError::BadRequest("service é obrigatório".into()))?;
            let service: Service = serde_json::from_value(value)
                .map_err(|e| AppError::BadRequest(format!("service inválido: {e}")))?;

            let found = state.customer_service.save_service(id, service).await?;
            Ok(found_response(found))
        }

        "deleteService" => {
            let id = required_customer_id(&request)?;
            let service_id = request
                .service_id
                .ok_or_else(|| AppError::BadRequest("serviceId é obrigatório".into()))?;

            let found = state.customer_service.delete_service(id, &service_id).await?;
            Ok(found_response(found))
        }

        other => Err(AppError::UnknownAction(other.to_string())),
    }
}

fn required_customer_id(request: &ApiRequest) -> Result<i64, AppError> {
    request
        .customer_id
        .ok_or_else(|| AppError::BadRequest("customerId é obrigatório".into()))
}

// Cliente inexistente responde no corpo ({success:false}), não no status:
// os clientes da API ramificam pelo payload.
fn found_response(found: bool) -> Value {
    if found {
        json!({ "success": true })
    } else {
        json!({ "success": false, "error": "Customer not found" })
    }
}
