//! Process-wide cache of normalized query results.
//!
//! Entries produced through the authenticated API are namespaced with a
//! `db_` key prefix; playground entries are unprefixed. Auth transitions
//! purge exactly one namespace: login drops playground entries, logout
//! drops `db_` entries.
//!
//! Write discipline: entity reads/writes go through the flow layer and
//! bulk purges through the auth provider. The mutating methods are
//! crate-private so external callers get a read-only view.

use dashmap::DashMap;
use serde_json::Value;

use crate::entity::EntityType;

/// Key prefix marking an entry as produced through the authenticated API.
pub const AUTH_NAMESPACE: &str = "db_";

#[derive(Default)]
pub struct QueryCache {
    entries: DashMap<String, Value>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a single entity.
    pub fn entity_key(authenticated: bool, entity_type: EntityType, id: &str) -> String {
        format!(
            "{}{}_{}",
            namespace(authenticated),
            entity_type.as_str(),
            id
        )
    }

    /// Cache key for an entity list scoped to a parent (or `all`).
    pub fn list_key(
        authenticated: bool,
        entity_type: EntityType,
        parent_id: Option<&str>,
    ) -> String {
        format!(
            "{}{}_list_{}",
            namespace(authenticated),
            entity_type.as_str(),
            parent_id.unwrap_or("all")
        )
    }

    /// Cache key for the active company overview.
    pub fn overview_key(authenticated: bool) -> String {
        format!("{}company_overview", namespace(authenticated))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every `db_`-namespaced entry. Returns how many were removed.
    pub(crate) fn purge_authenticated(&self) -> usize {
        self.purge_where(|key| key.starts_with(AUTH_NAMESPACE))
    }

    /// Drop every playground (non-`db_`) entry. Returns how many were
    /// removed.
    pub(crate) fn purge_playground(&self) -> usize {
        self.purge_where(|key| !key.starts_with(AUTH_NAMESPACE))
    }

    fn purge_where(&self, mut predicate: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }
}

fn namespace(authenticated: bool) -> &'static str {
    if authenticated {
        AUTH_NAMESPACE
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_are_namespaced_by_auth() {
        assert_eq!(
            QueryCache::entity_key(true, EntityType::Account, "acct_1"),
            "db_account_acct_1"
        );
        assert_eq!(
            QueryCache::entity_key(false, EntityType::Account, "temp_account_1_ab"),
            "account_temp_account_1_ab"
        );
        assert_eq!(
            QueryCache::list_key(true, EntityType::Persona, Some("acct_1")),
            "db_persona_list_acct_1"
        );
        assert_eq!(
            QueryCache::list_key(false, EntityType::Company, None),
            "company_list_all"
        );
    }

    #[test]
    fn test_purge_authenticated_leaves_playground_entries() {
        let cache = QueryCache::new();
        cache.insert("db_account_1".into(), json!({ "id": "1" }));
        cache.insert("account_temp_1".into(), json!({ "id": "temp_1" }));

        assert_eq!(cache.purge_authenticated(), 1);
        assert!(cache.get("db_account_1").is_none());
        assert!(cache.get("account_temp_1").is_some());
    }

    #[test]
    fn test_purge_playground_leaves_authenticated_entries() {
        let cache = QueryCache::new();
        cache.insert("db_account_1".into(), json!({ "id": "1" }));
        cache.insert("account_temp_1".into(), json!({ "id": "temp_1" }));
        cache.insert("company_overview".into(), json!({ "id": "temp_2" }));

        assert_eq!(cache.purge_playground(), 2);
        assert!(cache.get("db_account_1").is_some());
        assert_eq!(cache.len(), 1);
    }
}
