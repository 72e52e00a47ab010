//! Dual-path entity writes.
//!
//! `EntityFlow` is the one component that writes entities into the query
//! cache and the draft store. Every create runs the AI generate step
//! first, then branches on auth state:
//!
//! - authenticated: create through the REST API, normalize the server's
//!   response, cache it, invalidate the list entry;
//! - anonymous: synthesize a record with the same top-level/`data` split
//!   the server would have produced (explicit construction, not
//!   inference), run it through the same normalization function — that
//!   step is what guarantees shape parity — and persist it as a draft.
//!
//! Updates and deletes route on the id: `temp_` ids go to the draft
//! store, server ids to the API. An anonymous write against a server id
//! is a programming error and fails loudly.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::{accounts, campaigns, companies, personas, ApiClient, ApiError};
use crate::auth::AuthState;
use crate::cache::QueryCache;
use crate::drafts::{DraftError, DraftStore};
use crate::entity::{generate_temp_id, is_temp_id, EntityType};
use crate::normalize::{check_field_structure, normalize_entity};
use crate::types::{
    AccountGenerateRequest, CampaignGenerateRequest, CompanyGenerateRequest,
    PersonaGenerateRequest,
};

/// Errors from dual-path entity operations.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("Anonymous sessions cannot modify server record {id}")]
    AnonymousServerWrite { id: String },

    #[error("Draft {id} not found")]
    DraftMissing { id: String },

    #[error("Companies cannot be deleted remotely")]
    CompanyDeleteUnsupported,
}

/// A create operation: the AI request plus the parent ids the entity type
/// requires. The variant fixes the entity type, so there is no separate
/// type tag to keep in sync.
pub enum CreateRequest {
    Company(CompanyGenerateRequest),
    Account {
        company_id: String,
        request: AccountGenerateRequest,
    },
    Persona {
        account_id: String,
        request: PersonaGenerateRequest,
    },
    Campaign {
        account_id: String,
        persona_id: String,
        request: CampaignGenerateRequest,
    },
}

impl CreateRequest {
    pub fn entity_type(&self) -> EntityType {
        match self {
            CreateRequest::Company(_) => EntityType::Company,
            CreateRequest::Account { .. } => EntityType::Account,
            CreateRequest::Persona { .. } => EntityType::Persona,
            CreateRequest::Campaign { .. } => EntityType::Campaign,
        }
    }

    /// The direct parent id, when the type has one.
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            CreateRequest::Company(_) => None,
            CreateRequest::Account { company_id, .. } => Some(company_id),
            CreateRequest::Persona { account_id, .. } => Some(account_id),
            CreateRequest::Campaign { persona_id, .. } => Some(persona_id),
        }
    }
}

/// Result of a create, identical in shape across both paths.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub id: String,
    pub entity: Value,
    pub is_temporary: bool,
}

#[derive(Clone)]
pub struct EntityFlow {
    api: Arc<ApiClient>,
    drafts: Arc<DraftStore>,
    cache: Arc<QueryCache>,
    auth: Arc<AuthState>,
}

impl EntityFlow {
    pub fn new(
        api: Arc<ApiClient>,
        drafts: Arc<DraftStore>,
        cache: Arc<QueryCache>,
        auth: Arc<AuthState>,
    ) -> Self {
        Self {
            api,
            drafts,
            cache,
            auth,
        }
    }

    /// Generate, then persist. The generate step is strictly sequenced
    /// before the create/save step.
    pub async fn create(&self, request: CreateRequest) -> Result<CreateOutcome, FlowError> {
        let ai_result = self.generate(&request).await?;
        if self.auth.is_authenticated() {
            self.persist_remote(&request, &ai_result).await
        } else {
            self.persist_playground(&request, &ai_result)
        }
    }

    async fn generate(&self, request: &CreateRequest) -> Result<Value, ApiError> {
        match request {
            CreateRequest::Company(req) => companies::generate_company(&self.api, req).await,
            CreateRequest::Account { request, .. } => {
                accounts::generate_account(&self.api, request).await
            }
            CreateRequest::Persona {
                account_id,
                request,
            } => personas::generate_persona(&self.api, account_id, request).await,
            CreateRequest::Campaign { request, .. } => {
                campaigns::generate_campaign(&self.api, request).await
            }
        }
    }

    pub(crate) async fn persist_remote(
        &self,
        request: &CreateRequest,
        ai_result: &Value,
    ) -> Result<CreateOutcome, FlowError> {
        let entity_type = request.entity_type();
        let payload = crate::normalize::to_create_payload(entity_type, ai_result);

        let record = match request {
            CreateRequest::Company(_) => companies::create_company(&self.api, &payload).await?,
            CreateRequest::Account { company_id, .. } => {
                accounts::create_account(&self.api, company_id, &payload).await?
            }
            CreateRequest::Persona { account_id, .. } => {
                personas::create_persona(&self.api, account_id, &payload).await?
            }
            CreateRequest::Campaign {
                account_id,
                persona_id,
                ..
            } => campaigns::create_campaign(&self.api, account_id, persona_id, &payload).await?,
        };

        let entity = self.normalize_checked(entity_type, &record);
        let id = id_of(&entity);
        self.cache
            .insert(QueryCache::entity_key(true, entity_type, &id), entity.clone());
        self.cache
            .remove(&QueryCache::list_key(true, entity_type, request.parent_id()));

        Ok(CreateOutcome {
            id,
            entity,
            is_temporary: false,
        })
    }

    pub(crate) fn persist_playground(
        &self,
        request: &CreateRequest,
        ai_result: &Value,
    ) -> Result<CreateOutcome, FlowError> {
        let entity_type = request.entity_type();
        let temp_id = generate_temp_id(entity_type);
        let record = synthesize_record(request, &temp_id, ai_result);
        let entity = self.normalize_checked(entity_type, &record);

        self.drafts
            .save_draft_with_id(&temp_id, entity_type, &entity, request.parent_id())?;

        Ok(CreateOutcome {
            id: temp_id,
            entity,
            is_temporary: true,
        })
    }

    /// Field-preserving update, routed on the id.
    pub async fn update(
        &self,
        entity_type: EntityType,
        id: &str,
        updates: &Map<String, Value>,
    ) -> Result<Value, FlowError> {
        if is_temp_id(id) {
            let found = self
                .drafts
                .update_draft_preserve_fields(entity_type, id, updates)?;
            if !found {
                return Err(FlowError::DraftMissing { id: id.to_string() });
            }
            let draft = self
                .drafts
                .get_draft(entity_type, id)?
                .ok_or_else(|| FlowError::DraftMissing { id: id.to_string() })?;
            return Ok(draft.data);
        }

        if !self.auth.is_authenticated() {
            return Err(FlowError::AnonymousServerWrite { id: id.to_string() });
        }

        let key = QueryCache::entity_key(true, entity_type, id);
        let current = match self.cache.get(&key) {
            Some(entity) => entity,
            None => {
                let record = self.fetch_remote(entity_type, id).await?;
                self.normalize_checked(entity_type, &record)
            }
        };

        let record = match entity_type {
            EntityType::Company => {
                companies::update_company_preserve_fields(&self.api, id, &current, updates).await?
            }
            EntityType::Account => {
                accounts::update_account_preserve_fields(&self.api, id, &current, updates).await?
            }
            EntityType::Persona => {
                personas::update_persona_preserve_fields(&self.api, id, &current, updates).await?
            }
            EntityType::Campaign => {
                campaigns::update_campaign_preserve_fields(&self.api, id, &current, updates)
                    .await?
            }
        };

        let entity = self.normalize_checked(entity_type, &record);
        self.cache.insert(key, entity.clone());
        Ok(entity)
    }

    /// Delete, routed on the id. `parent_id` scopes the list entry to
    /// invalidate on the authenticated path.
    pub async fn delete(
        &self,
        entity_type: EntityType,
        id: &str,
        parent_id: Option<&str>,
    ) -> Result<(), FlowError> {
        if is_temp_id(id) {
            self.drafts.remove_draft(entity_type, id)?;
            return Ok(());
        }

        if !self.auth.is_authenticated() {
            return Err(FlowError::AnonymousServerWrite { id: id.to_string() });
        }

        match entity_type {
            EntityType::Company => return Err(FlowError::CompanyDeleteUnsupported),
            EntityType::Account => accounts::delete_account(&self.api, id).await?,
            EntityType::Persona => personas::delete_persona(&self.api, id).await?,
            EntityType::Campaign => campaigns::delete_campaign(&self.api, id).await?,
        }

        self.cache
            .remove(&QueryCache::entity_key(true, entity_type, id));
        self.cache
            .remove(&QueryCache::list_key(true, entity_type, parent_id));
        Ok(())
    }

    async fn fetch_remote(
        &self,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Value, ApiError> {
        match entity_type {
            EntityType::Company => companies::get_company(&self.api, id).await,
            EntityType::Account => accounts::get_account(&self.api, id).await,
            EntityType::Persona => personas::get_persona(&self.api, id).await,
            EntityType::Campaign => campaigns::get_campaign(&self.api, id).await,
        }
    }

    fn normalize_checked(&self, entity_type: EntityType, record: &Value) -> Value {
        let entity = normalize_entity(entity_type, record);
        let issues = check_field_structure(entity_type, &entity);
        if !issues.is_empty() {
            log::debug!(
                "normalized {entity_type} missing expected fields: {:?}",
                issues.iter().map(|i| i.field).collect::<Vec<_>>()
            );
        }
        entity
    }
}

/// Build the record the server would have produced for this create —
/// same top-level relational fields, same `data` column. Explicit per
/// type; nothing is inferred.
fn synthesize_record(request: &CreateRequest, temp_id: &str, ai_result: &Value) -> Value {
    let now = Utc::now().to_rfc3339();
    let mut record = Map::new();
    record.insert("id".into(), Value::String(temp_id.to_string()));

    match request {
        CreateRequest::Company(_) => {
            record.insert(
                "name".into(),
                Value::String(ai_str(ai_result, &["companyName", "company_name", "name"])),
            );
            record.insert(
                "url".into(),
                Value::String(ai_str(ai_result, &["companyUrl", "company_url"])),
            );
        }
        CreateRequest::Account { company_id, .. } => {
            record.insert("companyId".into(), Value::String(company_id.clone()));
            record.insert(
                "name".into(),
                Value::String(ai_str(
                    ai_result,
                    &["targetAccountName", "target_account_name", "name"],
                )),
            );
        }
        CreateRequest::Persona { account_id, .. } => {
            record.insert("accountId".into(), Value::String(account_id.clone()));
            record.insert(
                "name".into(),
                Value::String(ai_str(
                    ai_result,
                    &["targetPersonaName", "target_persona_name", "name"],
                )),
            );
        }
        CreateRequest::Campaign {
            account_id,
            persona_id,
            ..
        } => {
            record.insert("accountId".into(), Value::String(account_id.clone()));
            record.insert("personaId".into(), Value::String(persona_id.clone()));
            let subject = ai_result
                .get("subjects")
                .and_then(|s| s.get("primary"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            record.insert("name".into(), Value::String(subject.to_string()));
        }
    }

    record.insert("data".into(), ai_result.clone());
    record.insert("createdAt".into(), Value::String(now.clone()));
    record.insert("updatedAt".into(), Value::String(now));
    Value::Object(record)
}

fn ai_str(ai_result: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| ai_result.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn id_of(entity: &Value) -> String {
    let id = entity
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if id.is_empty() {
        log::warn!("normalized entity carries no id");
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn build_flow() -> (tempfile::TempDir, EntityFlow) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = Arc::new(AuthState::new());
        let api = Arc::new(ApiClient::new(&ClientConfig::default(), auth.clone()));
        let drafts =
            Arc::new(DraftStore::open_at(dir.path().join("playground.db")).unwrap());
        let cache = Arc::new(QueryCache::new());
        let flow = EntityFlow::new(api, drafts, cache, auth);
        (dir, flow)
    }

    fn account_ai_result() -> Value {
        json!({
            "target_account_name": "Mid-market 3PLs",
            "target_account_description": "Regional logistics providers",
            "target_account_rationale": ["High manual picking costs"],
            "firmographics": {
                "industry": ["Logistics"],
                "employees": "200-1000",
                "revenue": "$50M-$250M",
                "geography": ["North America"],
                "business_model": ["B2B"],
                "funding_stage": [],
                "keywords": ["3PL"]
            },
            "buying_signals": [],
            "buying_signals_rationale": []
        })
    }

    fn key_set(value: &Value) -> BTreeSet<String> {
        value
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn sample_request(entity_type: EntityType) -> (CreateRequest, Value) {
        match entity_type {
            EntityType::Company => (
                CreateRequest::Company(CompanyGenerateRequest::default()),
                json!({
                    "company_name": "Acme Robotics",
                    "company_url": "https://acme.dev",
                    "description": "Warehouse automation",
                    "business_profile_insights": [],
                    "capabilities": [],
                    "use_case_analysis_insights": [],
                    "positioning_insights": [],
                    "objections": []
                }),
            ),
            EntityType::Account => (
                CreateRequest::Account {
                    company_id: "comp_1".into(),
                    request: AccountGenerateRequest::default(),
                },
                account_ai_result(),
            ),
            EntityType::Persona => (
                CreateRequest::Persona {
                    account_id: "acct_1".into(),
                    request: PersonaGenerateRequest::default(),
                },
                json!({
                    "target_persona_name": "VP Operations",
                    "target_persona_description": "Owns throughput",
                    "target_persona_rationale": [],
                    "demographics": { "job_titles": [], "departments": [],
                                      "seniority": [], "buying_roles": [],
                                      "job_description_keywords": [] },
                    "use_cases": [],
                    "buying_signals": [],
                    "objections": [],
                    "goals": [],
                    "purchase_journey": []
                }),
            ),
            EntityType::Campaign => (
                CreateRequest::Campaign {
                    account_id: "acct_1".into(),
                    persona_id: "pers_1".into(),
                    request: CampaignGenerateRequest::default(),
                },
                json!({
                    "subjects": { "primary": "Cut picking costs", "alternatives": [] },
                    "segments": [{ "type": "opening", "text": "Hi" }],
                    "writing_process": {}
                }),
            ),
        }
    }

    /// The record the authenticated server would return for the same AI
    /// result, used to prove shape parity without a network.
    fn simulated_server_record(request: &CreateRequest, ai_result: &Value) -> Value {
        let mut record = synthesize_record(request, "srv_1", ai_result)
            .as_object()
            .cloned()
            .unwrap();
        record.insert("id".into(), json!("srv_1"));
        record.insert("user_id".into(), json!("user_9"));
        Value::Object(record)
    }

    #[test]
    fn test_shape_parity_across_paths() {
        let (_dir, flow) = build_flow();
        for entity_type in EntityType::ALL {
            let (request, ai_result) = sample_request(entity_type);

            let playground = flow.persist_playground(&request, &ai_result).unwrap();
            assert!(playground.is_temporary);
            assert!(is_temp_id(&playground.id));

            let server_record = simulated_server_record(&request, &ai_result);
            let authenticated = normalize_entity(entity_type, &server_record);

            assert_eq!(
                key_set(&playground.entity),
                key_set(&authenticated),
                "key sets diverge for {entity_type}"
            );
        }
    }

    #[test]
    fn test_playground_create_persists_a_draft() {
        let (_dir, flow) = build_flow();
        let (request, ai_result) = sample_request(EntityType::Account);

        let outcome = flow.persist_playground(&request, &ai_result).unwrap();
        let drafts = flow
            .drafts
            .get_drafts_by_parent(EntityType::Account, "comp_1")
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].temp_id, outcome.id);
        assert_eq!(drafts[0].data["targetAccountName"], "Mid-market 3PLs");
        assert_eq!(outcome.entity["firmographics"]["industry"][0], "Logistics");
    }

    #[test]
    fn test_playground_entity_passes_structure_check() {
        let (_dir, flow) = build_flow();
        let (request, ai_result) = sample_request(EntityType::Persona);
        let outcome = flow.persist_playground(&request, &ai_result).unwrap();
        assert!(check_field_structure(EntityType::Persona, &outcome.entity).is_empty());
    }

    #[tokio::test]
    async fn test_update_routes_temp_ids_to_drafts() {
        let (_dir, flow) = build_flow();
        let (request, ai_result) = sample_request(EntityType::Account);
        let outcome = flow.persist_playground(&request, &ai_result).unwrap();

        let mut updates = Map::new();
        updates.insert("targetAccountName".into(), json!("Enterprise 3PLs"));
        let updated = flow
            .update(EntityType::Account, &outcome.id, &updates)
            .await
            .unwrap();

        assert_eq!(updated["targetAccountName"], "Enterprise 3PLs");
        assert_eq!(updated["firmographics"]["industry"][0], "Logistics");
    }

    #[tokio::test]
    async fn test_update_of_missing_draft_fails() {
        let (_dir, flow) = build_flow();
        let result = flow
            .update(
                EntityType::Account,
                "temp_account_0_missing0",
                &Map::new(),
            )
            .await;
        assert!(matches!(result, Err(FlowError::DraftMissing { .. })));
    }

    #[tokio::test]
    async fn test_anonymous_update_of_server_id_fails_loudly() {
        let (_dir, flow) = build_flow();
        let result = flow.update(EntityType::Account, "acct_1", &Map::new()).await;
        assert!(matches!(
            result,
            Err(FlowError::AnonymousServerWrite { .. })
        ));
    }

    #[tokio::test]
    async fn test_anonymous_delete_of_server_id_fails_loudly() {
        let (_dir, flow) = build_flow();
        let result = flow.delete(EntityType::Campaign, "camp_1", None).await;
        assert!(matches!(
            result,
            Err(FlowError::AnonymousServerWrite { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_routes_temp_ids_to_drafts() {
        let (_dir, flow) = build_flow();
        let (request, ai_result) = sample_request(EntityType::Campaign);
        let outcome = flow.persist_playground(&request, &ai_result).unwrap();

        flow.delete(EntityType::Campaign, &outcome.id, None)
            .await
            .unwrap();
        assert!(flow
            .drafts
            .get_drafts(EntityType::Campaign)
            .unwrap()
            .is_empty());
    }
}
