//! Best-effort migration of playground drafts into the backend.
//!
//! Runs in dependency order (company → account → persona → campaign),
//! remapping temp parent ids to the server ids assigned along the way.
//! Per-draft failures are collected, not fatal: whatever migrated is
//! removed from the store, whatever failed stays behind with its error in
//! the report. Wired in as the `MigrateOnLogin` strategy and callable on
//! its own.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::api::{accounts, campaigns, companies, personas, ApiClient};
use crate::drafts::{Draft, DraftStore};
use crate::entity::{is_temp_id, EntityType};
use crate::normalize::to_create_payload;

/// Outcome of a migration run.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub migrated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Copy every playground draft into the backend. Never fails as a whole;
/// the report says what made it.
pub async fn migrate_drafts_to_db(drafts: &DraftStore, api: &ApiClient) -> MigrationReport {
    let mut report = MigrationReport::default();
    // temp id → server id, filled as parents migrate
    let mut id_map: HashMap<String, String> = HashMap::new();
    // persona server id → its account server id (campaign creation takes both)
    let mut persona_account: HashMap<String, String> = HashMap::new();

    for entity_type in EntityType::ALL {
        let list = match drafts.get_drafts(entity_type) {
            Ok(list) => list,
            Err(e) => {
                report
                    .errors
                    .push(format!("could not read {entity_type} drafts: {e}"));
                continue;
            }
        };

        // Oldest first so parents exist before their children.
        for draft in list.into_iter().rev() {
            match migrate_one(api, entity_type, &draft, &id_map, &persona_account).await {
                Ok(new_id) => {
                    if entity_type == EntityType::Persona {
                        if let Some(account_id) = resolve_parent(&draft, &id_map) {
                            persona_account.insert(new_id.clone(), account_id);
                        }
                    }
                    id_map.insert(draft.temp_id.clone(), new_id);
                    report.migrated += 1;
                    if let Err(e) = drafts.remove_draft(entity_type, &draft.temp_id) {
                        log::warn!("migrated draft {} but could not remove it: {e}", draft.temp_id);
                    }
                }
                Err(message) => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {message}", draft.temp_id));
                }
            }
        }
    }

    log::info!(
        "draft migration finished: {} migrated, {} failed",
        report.migrated,
        report.failed
    );
    report
}

async fn migrate_one(
    api: &ApiClient,
    entity_type: EntityType,
    draft: &Draft,
    id_map: &HashMap<String, String>,
    persona_account: &HashMap<String, String>,
) -> Result<String, String> {
    let payload = to_create_payload(entity_type, &draft.data);

    let record = match entity_type {
        EntityType::Company => companies::create_company(api, &payload)
            .await
            .map_err(|e| e.to_string())?,
        EntityType::Account => {
            let company_id = resolve_parent(draft, id_map)
                .ok_or("owning company was not migrated")?;
            accounts::create_account(api, &company_id, &payload)
                .await
                .map_err(|e| e.to_string())?
        }
        EntityType::Persona => {
            let account_id = resolve_parent(draft, id_map)
                .ok_or("owning account was not migrated")?;
            personas::create_persona(api, &account_id, &payload)
                .await
                .map_err(|e| e.to_string())?
        }
        EntityType::Campaign => {
            let persona_id = resolve_parent(draft, id_map)
                .ok_or("owning persona was not migrated")?;
            let account_id = campaign_account_id(draft, &persona_id, id_map, persona_account)
                .ok_or("owning account was not migrated")?;
            campaigns::create_campaign(api, &account_id, &persona_id, &payload)
                .await
                .map_err(|e| e.to_string())?
        }
    };

    record
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| "backend response carried no id".to_string())
}

/// Map a draft's parent to its server id: temp parents go through the id
/// map, server parents pass through.
fn resolve_parent(draft: &Draft, id_map: &HashMap<String, String>) -> Option<String> {
    let parent = draft.parent_id.as_deref()?;
    if is_temp_id(parent) {
        id_map.get(parent).cloned()
    } else {
        Some(parent.to_string())
    }
}

fn campaign_account_id(
    draft: &Draft,
    persona_id: &str,
    id_map: &HashMap<String, String>,
    persona_account: &HashMap<String, String>,
) -> Option<String> {
    if let Some(account_id) = persona_account.get(persona_id) {
        return Some(account_id.clone());
    }
    // The persona migrated in an earlier run (or was never a draft):
    // fall back to the account id the campaign itself carries.
    let account_id = draft.data.get("accountId").and_then(Value::as_str)?;
    if account_id.is_empty() {
        return None;
    }
    if is_temp_id(account_id) {
        id_map.get(account_id).cloned()
    } else {
        Some(account_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft_with_parent(parent_id: Option<&str>) -> Draft {
        Draft {
            temp_id: "temp_account_1_aa".into(),
            entity_type: EntityType::Account,
            data: json!({}),
            created_at: chrono::Utc::now().to_rfc3339(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve_parent_remaps_temp_ids() {
        let mut id_map = HashMap::new();
        id_map.insert("temp_company_1_aa".to_string(), "comp_1".to_string());

        let draft = draft_with_parent(Some("temp_company_1_aa"));
        assert_eq!(resolve_parent(&draft, &id_map), Some("comp_1".into()));
    }

    #[test]
    fn test_resolve_parent_passes_server_ids_through() {
        let draft = draft_with_parent(Some("comp_1"));
        assert_eq!(resolve_parent(&draft, &HashMap::new()), Some("comp_1".into()));
    }

    #[test]
    fn test_resolve_parent_unmigrated_temp_is_none() {
        let draft = draft_with_parent(Some("temp_company_1_aa"));
        assert_eq!(resolve_parent(&draft, &HashMap::new()), None);
    }

    #[test]
    fn test_campaign_account_id_prefers_persona_mapping() {
        let mut persona_account = HashMap::new();
        persona_account.insert("pers_1".to_string(), "acct_1".to_string());

        let mut draft = draft_with_parent(Some("pers_1"));
        draft.data = json!({ "accountId": "acct_other" });

        assert_eq!(
            campaign_account_id(&draft, "pers_1", &HashMap::new(), &persona_account),
            Some("acct_1".into())
        );
    }

    #[test]
    fn test_campaign_account_id_falls_back_to_draft_data() {
        let mut draft = draft_with_parent(Some("pers_1"));
        draft.data = json!({ "accountId": "acct_9" });

        assert_eq!(
            campaign_account_id(&draft, "pers_1", &HashMap::new(), &HashMap::new()),
            Some("acct_9".into())
        );
    }
}
