//! Persona service — REST calls nested under the owning account.

use serde_json::{Map, Value};

use super::{as_array, ApiClient, ApiError};
use crate::entity::EntityType;
use crate::normalize::to_update_payload;
use crate::types::PersonaGenerateRequest;

pub async fn list_personas(
    api: &ApiClient,
    account_id: &str,
) -> Result<Vec<Value>, ApiError> {
    Ok(as_array(
        api.get(&format!("/accounts/{account_id}/personas"), &[])
            .await?,
    ))
}

pub async fn get_persona(api: &ApiClient, id: &str) -> Result<Value, ApiError> {
    api.get(&format!("/personas/{id}"), &[]).await
}

pub async fn create_persona(
    api: &ApiClient,
    account_id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.post(&format!("/accounts/{account_id}/personas"), &[], Some(payload))
        .await
}

pub async fn update_persona(
    api: &ApiClient,
    id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.put(&format!("/personas/{id}"), payload).await
}

pub async fn delete_persona(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.delete(&format!("/personas/{id}")).await
}

/// Run the AI profiling step for a persona under an account.
pub async fn generate_persona(
    api: &ApiClient,
    account_id: &str,
    request: &PersonaGenerateRequest,
) -> Result<Value, ApiError> {
    let body = serde_json::to_value(request)?;
    api.post(
        &format!("/accounts/{account_id}/personas/generate"),
        &[],
        Some(&body),
    )
    .await
}

/// Update a persona without dropping fields the caller didn't touch.
pub async fn update_persona_preserve_fields(
    api: &ApiClient,
    id: &str,
    current: &Value,
    updates: &Map<String, Value>,
) -> Result<Value, ApiError> {
    let payload = to_update_payload(EntityType::Persona, current, updates);
    update_persona(api, id, &payload).await
}
