//! Entity identity: the four tracked entity types, their static
//! descriptors, and client-generated temporary ids.
//!
//! The descriptor table is the single place that knows an entity type's
//! wire collection, route template, parent requirement, and expected
//! normalized key set. Adding an entity type means one enum variant and
//! one table row.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of entity being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Company,
    Account,
    Persona,
    Campaign,
}

impl EntityType {
    /// All entity types in dependency order (parents before children).
    pub const ALL: [EntityType; 4] = [
        EntityType::Company,
        EntityType::Account,
        EntityType::Persona,
        EntityType::Campaign,
    ];

    /// String label for storage keys and temp ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::Account => "account",
            EntityType::Persona => "persona",
            EntityType::Campaign => "campaign",
        }
    }

    /// Parse from a storage label.
    pub fn parse(s: &str) -> Option<EntityType> {
        match s {
            "company" => Some(EntityType::Company),
            "account" => Some(EntityType::Account),
            "persona" => Some(EntityType::Persona),
            "campaign" => Some(EntityType::Campaign),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static per-type facts driving services, routing, validation, and the
/// normalized-shape checker.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub entity_type: EntityType,
    /// Wire collection segment, e.g. `companies` in `GET /api/companies`.
    pub collection: &'static str,
    /// Route template segment, e.g. `accounts` in `/app/accounts/{id}`.
    pub route_template: &'static str,
    /// Parent entity required for creation, if any.
    pub parent: Option<EntityType>,
    /// Query key carrying the parent id on list/create calls.
    pub parent_query_key: Option<&'static str>,
    /// Keys every normalized value of this type must carry. Checked
    /// diagnostically at the normalization boundary, never as a hard gate.
    pub expected_keys: &'static [&'static str],
}

static DESCRIPTORS: [EntityDescriptor; 4] = [
    EntityDescriptor {
        entity_type: EntityType::Company,
        collection: "companies",
        route_template: "company",
        parent: None,
        parent_query_key: None,
        expected_keys: &[
            "id",
            "companyName",
            "companyUrl",
            "description",
            "businessProfileInsights",
            "capabilities",
            "useCaseAnalysisInsights",
            "positioningInsights",
            "objections",
            "data",
        ],
    },
    EntityDescriptor {
        entity_type: EntityType::Account,
        collection: "accounts",
        route_template: "accounts",
        parent: Some(EntityType::Company),
        parent_query_key: Some("company_id"),
        expected_keys: &[
            "id",
            "companyId",
            "targetAccountName",
            "targetAccountDescription",
            "targetAccountRationale",
            "firmographics",
            "buyingSignals",
            "buyingSignalsRationale",
            "data",
        ],
    },
    EntityDescriptor {
        entity_type: EntityType::Persona,
        collection: "personas",
        route_template: "personas",
        parent: Some(EntityType::Account),
        parent_query_key: Some("account_id"),
        expected_keys: &[
            "id",
            "accountId",
            "targetPersonaName",
            "targetPersonaDescription",
            "targetPersonaRationale",
            "demographics",
            "useCases",
            "buyingSignals",
            "objections",
            "goals",
            "purchaseJourney",
            "data",
        ],
    },
    EntityDescriptor {
        entity_type: EntityType::Campaign,
        collection: "campaigns",
        route_template: "campaigns",
        parent: Some(EntityType::Persona),
        parent_query_key: Some("persona_id"),
        expected_keys: &[
            "id",
            "accountId",
            "personaId",
            "campaignName",
            "subjects",
            "segments",
            "writingProcess",
            "data",
        ],
    },
];

/// Look up the descriptor for an entity type.
pub fn descriptor(entity_type: EntityType) -> &'static EntityDescriptor {
    match entity_type {
        EntityType::Company => &DESCRIPTORS[0],
        EntityType::Account => &DESCRIPTORS[1],
        EntityType::Persona => &DESCRIPTORS[2],
        EntityType::Campaign => &DESCRIPTORS[3],
    }
}

// ============================================================================
// Temporary ids
// ============================================================================

/// Prefix marking a client-generated id that has never been persisted
/// server-side.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Generate a collision-resistant temporary id of the form
/// `temp_<type>_<millis>_<suffix>`.
pub fn generate_temp_id(entity_type: EntityType) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}_{}",
        TEMP_ID_PREFIX,
        entity_type.as_str(),
        millis,
        &uuid[..8]
    )
}

/// True iff `id` marks a draft that only exists client-side.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Extract the entity type embedded in a temporary id.
pub fn temp_id_entity_type(id: &str) -> Option<EntityType> {
    let rest = id.strip_prefix(TEMP_ID_PREFIX)?;
    EntityType::parse(rest.split('_').next()?)
}
