//! Campaign service — thin REST calls over `/campaigns`.

use serde_json::{Map, Value};

use super::{as_array, ApiClient, ApiError};
use crate::entity::EntityType;
use crate::normalize::to_update_payload;
use crate::types::CampaignGenerateRequest;

pub async fn list_campaigns(
    api: &ApiClient,
    account_id: &str,
) -> Result<Vec<Value>, ApiError> {
    Ok(as_array(
        api.get("/campaigns", &[("account_id", account_id)]).await?,
    ))
}

pub async fn get_campaign(api: &ApiClient, id: &str) -> Result<Value, ApiError> {
    api.get(&format!("/campaigns/{id}"), &[]).await
}

pub async fn create_campaign(
    api: &ApiClient,
    account_id: &str,
    persona_id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.post(
        "/campaigns",
        &[("account_id", account_id), ("persona_id", persona_id)],
        Some(payload),
    )
    .await
}

pub async fn update_campaign(
    api: &ApiClient,
    id: &str,
    payload: &Value,
) -> Result<Value, ApiError> {
    api.put(&format!("/campaigns/{id}"), payload).await
}

pub async fn delete_campaign(api: &ApiClient, id: &str) -> Result<(), ApiError> {
    api.delete(&format!("/campaigns/{id}")).await
}

/// Run the AI copywriting step for a campaign.
pub async fn generate_campaign(
    api: &ApiClient,
    request: &CampaignGenerateRequest,
) -> Result<Value, ApiError> {
    let body = serde_json::to_value(request)?;
    api.post("/campaigns/generate-ai", &[], Some(&body)).await
}

/// Update a campaign without dropping fields the caller didn't touch.
pub async fn update_campaign_preserve_fields(
    api: &ApiClient,
    id: &str,
    current: &Value,
    updates: &Map<String, Value>,
) -> Result<Value, ApiError> {
    let payload = to_update_payload(EntityType::Campaign, current, updates);
    update_campaign(api, id, &payload).await
}
