//! Wire-record → normalized-entity mapping, and the reverse for writes.
//!
//! A wire record is top-level relational fields plus an opaque JSON `data`
//! column. Normalization camelizes the whole tree, promotes every payload
//! key to the top level, derives display names, fills defaults through the
//! typed structs, and retains the camelCased payload under `data`. The
//! same functions run on records from the REST API and on records
//! synthesized for the playground path, which is what guarantees the two
//! paths produce identical shapes.
//!
//! Normalizing an already-normalized value is a no-op: top-level keys are
//! re-promoted only when they are either payload keys or part of the
//! type's expected key set, so server-side junk never leaks in and edits
//! made to promoted fields are never lost.

use serde_json::{Map, Value};

use crate::entity::{descriptor, EntityType};
use crate::keycase::keys_to_camel;
use crate::types::{
    NormalizedAccount, NormalizedCampaign, NormalizedCompany, NormalizedPersona,
};

/// Top-level wire keys consumed into derived fields rather than promoted.
const CONSUMED_KEYS: &[&str] = &["data", "name", "url"];

/// Relational/meta keys stripped from `data` content on writes.
const META_KEYS: &[&str] = &[
    "id",
    "data",
    "createdAt",
    "updatedAt",
    "companyId",
    "accountId",
    "personaId",
];

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a raw company record (wire or already-normalized).
pub fn normalize_company(raw: &Value) -> NormalizedCompany {
    let (top, payload, mut flat) = split_record(EntityType::Company, raw);

    flat.insert(
        "companyName".into(),
        Value::String(first_str(&[
            top.get("companyName"),
            top.get("name"),
            payload.get("companyName"),
        ])),
    );
    flat.insert(
        "companyUrl".into(),
        Value::String(first_str(&[
            top.get("companyUrl"),
            top.get("url"),
            payload.get("companyUrl"),
        ])),
    );
    flat.insert("data".into(), Value::Object(payload));

    from_flat(EntityType::Company, flat, |flat| NormalizedCompany {
        id: str_of(flat.get("id")),
        data: object_of(flat.get("data")),
        ..Default::default()
    })
}

/// Normalize a raw target-account record (wire or already-normalized).
pub fn normalize_account(raw: &Value) -> NormalizedAccount {
    let (top, payload, mut flat) = split_record(EntityType::Account, raw);

    flat.insert(
        "targetAccountName".into(),
        Value::String(first_str(&[
            top.get("targetAccountName"),
            top.get("name"),
            payload.get("targetAccountName"),
            payload.get("name"),
        ])),
    );
    flat.insert("data".into(), Value::Object(payload));

    from_flat(EntityType::Account, flat, |flat| NormalizedAccount {
        id: str_of(flat.get("id")),
        company_id: str_of(flat.get("companyId")),
        data: object_of(flat.get("data")),
        ..Default::default()
    })
}

/// Normalize a raw persona record (wire or already-normalized).
pub fn normalize_persona(raw: &Value) -> NormalizedPersona {
    let (top, payload, mut flat) = split_record(EntityType::Persona, raw);

    flat.insert(
        "targetPersonaName".into(),
        Value::String(first_str(&[
            top.get("targetPersonaName"),
            top.get("name"),
            payload.get("targetPersonaName"),
            payload.get("name"),
        ])),
    );
    flat.insert("data".into(), Value::Object(payload));

    from_flat(EntityType::Persona, flat, |flat| NormalizedPersona {
        id: str_of(flat.get("id")),
        account_id: str_of(flat.get("accountId")),
        data: object_of(flat.get("data")),
        ..Default::default()
    })
}

/// Normalize a raw campaign record (wire or already-normalized). The
/// display name falls back to the primary subject line.
pub fn normalize_campaign(raw: &Value) -> NormalizedCampaign {
    let (top, payload, mut flat) = split_record(EntityType::Campaign, raw);

    let primary_subject = flat
        .get("subjects")
        .and_then(|s| s.get("primary"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = first_str(&[top.get("campaignName"), top.get("name")]);
    flat.insert(
        "campaignName".into(),
        Value::String(if name.is_empty() { primary_subject } else { name }),
    );
    flat.insert("data".into(), Value::Object(payload));

    from_flat(EntityType::Campaign, flat, |flat| NormalizedCampaign {
        id: str_of(flat.get("id")),
        account_id: str_of(flat.get("accountId")),
        persona_id: str_of(flat.get("personaId")),
        data: object_of(flat.get("data")),
        ..Default::default()
    })
}

/// Normalize a raw record of any entity type into a JSON value.
pub fn normalize_entity(entity_type: EntityType, raw: &Value) -> Value {
    let result = match entity_type {
        EntityType::Company => serde_json::to_value(normalize_company(raw)),
        EntityType::Account => serde_json::to_value(normalize_account(raw)),
        EntityType::Persona => serde_json::to_value(normalize_persona(raw)),
        EntityType::Campaign => serde_json::to_value(normalize_campaign(raw)),
    };
    match result {
        Ok(v) => v,
        Err(e) => {
            log::warn!("failed to serialize normalized {entity_type}: {e}");
            Value::Object(Map::new())
        }
    }
}

/// Camelize a record and split it into (top-level object, payload object,
/// starting flat map). The flat map begins as the payload with legitimate
/// top-level keys overlaid: id/timestamps always, other keys only when
/// they are payload keys or expected for the type.
fn split_record(
    entity_type: EntityType,
    raw: &Value,
) -> (Map<String, Value>, Map<String, Value>, Map<String, Value>) {
    let camel = keys_to_camel(raw);
    let top = camel.as_object().cloned().unwrap_or_default();
    let payload = top
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let expected = descriptor(entity_type).expected_keys;
    let mut flat = payload.clone();
    for (key, value) in &top {
        if CONSUMED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if payload.contains_key(key) || expected.contains(&key.as_str()) {
            flat.insert(key.clone(), value.clone());
        }
    }
    for meta in ["id", "createdAt", "updatedAt"] {
        let v = first_str(&[top.get(meta), payload.get(meta)]);
        flat.insert(meta.into(), Value::String(v));
    }

    (top, payload, flat)
}

/// Deserialize the flat map into its typed shape, falling back to a
/// minimal value (id + data preserved) if the payload carries
/// incompatible types.
fn from_flat<T, F>(entity_type: EntityType, flat: Map<String, Value>, fallback: F) -> T
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(&Map<String, Value>) -> T,
{
    match serde_json::from_value(Value::Object(flat.clone())) {
        Ok(normalized) => normalized,
        Err(e) => {
            log::warn!("{entity_type} payload did not fit the normalized shape: {e}");
            fallback(&flat)
        }
    }
}

fn first_str(candidates: &[Option<&Value>]) -> String {
    candidates
        .iter()
        .filter_map(|v| v.and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn str_of(v: Option<&Value>) -> String {
    v.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn object_of(v: Option<&Value>) -> Map<String, Value> {
    v.and_then(Value::as_object).cloned().unwrap_or_default()
}

// ============================================================================
// Reverse mapping for writes
// ============================================================================

/// Build the wire create payload (`{name, [url,] data}`) from an AI result
/// or a normalized flat value. Relational/meta keys never travel inside
/// `data`.
pub fn to_create_payload(entity_type: EntityType, source: &Value) -> Value {
    let camel = keys_to_camel(source);
    let mut content = camel.as_object().cloned().unwrap_or_default();
    for meta in META_KEYS {
        content.remove(*meta);
    }

    let name = match entity_type {
        EntityType::Company => first_str(&[content.get("companyName"), content.get("name")]),
        EntityType::Account => {
            first_str(&[content.get("targetAccountName"), content.get("name")])
        }
        EntityType::Persona => {
            first_str(&[content.get("targetPersonaName"), content.get("name")])
        }
        EntityType::Campaign => {
            let primary = content
                .get("subjects")
                .and_then(|s| s.get("primary"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let explicit = first_str(&[content.get("campaignName"), content.get("name")]);
            if explicit.is_empty() {
                primary
            } else {
                explicit
            }
        }
    };

    let mut payload = Map::new();
    payload.insert("name".into(), Value::String(name));
    if entity_type == EntityType::Company {
        payload.insert(
            "url".into(),
            Value::String(first_str(&[content.get("companyUrl")])),
        );
    }
    payload.insert("data".into(), Value::Object(content));
    Value::Object(payload)
}

/// Build a field-preserving update payload: merge `updates` over the full
/// current field set (shallow, updates win) and wrap the result like a
/// create payload, so a partial edit never drops sibling fields.
pub fn to_update_payload(
    entity_type: EntityType,
    current: &Value,
    updates: &Map<String, Value>,
) -> Value {
    let mut merged = keys_to_camel(current).as_object().cloned().unwrap_or_default();
    for (key, value) in updates {
        merged.insert(key.clone(), value.clone());
    }
    to_create_payload(entity_type, &Value::Object(merged))
}

// ============================================================================
// Field-structure check
// ============================================================================

/// A normalized value missing one of its type's expected keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
}

/// Compare a normalized value's key set against the expected key set for
/// its type. Diagnostic only; callers log the result, nothing gates on it.
pub fn check_field_structure(entity_type: EntityType, normalized: &Value) -> Vec<FieldIssue> {
    let expected = descriptor(entity_type).expected_keys;
    let Some(obj) = normalized.as_object() else {
        return expected.iter().map(|field| FieldIssue { field }).collect();
    };
    expected
        .iter()
        .filter(|key| !obj.contains_key(**key))
        .map(|field| FieldIssue { field })
        .collect()
}
