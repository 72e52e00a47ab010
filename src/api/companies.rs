//! Company service — thin REST calls over `/companies`.

use serde_json::{Map, Value};

use super::{as_array, ApiClient, ApiError};
use crate::entity::EntityType;
use crate::normalize::to_update_payload;
use crate::types::CompanyGenerateRequest;

pub async fn list_companies(api: &ApiClient) -> Result<Vec<Value>, ApiError> {
    Ok(as_array(api.get("/companies", &[]).await?))
}

pub async fn get_company(api: &ApiClient, id: &str) -> Result<Value, ApiError> {
    api.get(&format!("/companies/{id}"), &[]).await
}

pub async fn create_company(api: &ApiClient, payload: &Value) -> Result<Value, ApiError> {
    api.post("/companies", &[], Some(payload)).await
}

pub async fn update_company(
    api: &ApiClient,
    id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.put(&format!("/companies/{id}"), payload).await
}

/// Run the AI analysis step for a company profile.
pub async fn generate_company(
    api: &ApiClient,
    request: &CompanyGenerateRequest,
) -> Result<Value, ApiError> {
    let body = serde_json::to_value(request)?;
    api.post("/companies/generate-ai", &[], Some(&body)).await
}

/// Update a company without dropping fields the caller didn't touch:
/// `updates` merges over the full current field set before sending.
pub async fn update_company_preserve_fields(
    api: &ApiClient,
    id: &str,
    current: &Value,
    updates: &Map<String, Value>,
) -> Result<Value, ApiError> {
    let payload = to_update_payload(EntityType::Company, current, updates);
    update_company(api, id, &payload).await
}
