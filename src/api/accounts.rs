//! Target-account service — thin REST calls over `/accounts`.

use serde_json::{Map, Value};

use super::{as_array, ApiClient, ApiError};
use crate::entity::EntityType;
use crate::normalize::to_update_payload;
use crate::types::AccountGenerateRequest;

pub async fn list_accounts(
    api: &ApiClient,
    company_id: &str,
) -> Result<Vec<Value>, ApiError> {
    Ok(as_array(
        api.get("/accounts", &[("company_id", company_id)]).await?,
    ))
}

pub async fn get_account(api: &ApiClient, id: &str) -> Result<Value, ApiError> {
    api.get(&format!("/accounts/{id}"), &[]).await
}

pub async fn create_account(
    api: &ApiClient,
    company_id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.post("/accounts", &[("company_id", company_id)], Some(payload))
        .await
}

pub async fn update_account(
    api: &ApiClient,
    id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.put(&format!("/accounts/{id}"), payload).await
}

pub async fn delete_account(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.delete(&format!("/accounts/{id}")).await
}

/// Run the AI profiling step for a target account.
pub async fn generate_account(
    api: &ApiClient,
    request: &AccountGenerateRequest,
) -> Result<Value, ApiError> {
    let body = serde_json::to_value(request)?;
    api.post("/accounts/generate-ai", &[], Some(&body)).await
}

/// Update an account without dropping fields the caller didn't touch.
pub async fn update_account_preserve_fields(
    api: &ApiClient,
    id: &str,
    current: &Value,
    updates: &Map<String, Value>,
) -> Result<Value, ApiError> {
    let payload = to_update_payload(EntityType::Account, current, updates);
    update_account(api, id, &payload).await
}
