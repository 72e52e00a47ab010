//! Active-company resolution.
//!
//! Most pages cannot function without knowing which company the session
//! is working on. Resolution order, first non-empty wins: the cached
//! overview, a fresh authenticated fetch, and — for anonymous sessions —
//! the newest company draft in the playground store.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::api::{companies, ApiClient, ApiError};
use crate::auth::AuthState;
use crate::cache::QueryCache;
use crate::drafts::{DraftError, DraftStore};
use crate::entity::EntityType;
use crate::normalize::normalize_entity;

/// Where the active company came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Cache,
    Remote,
    Draft,
    Missing,
}

/// The resolved company context.
#[derive(Debug, Clone)]
pub struct CompanyContext {
    pub company: Option<Value>,
    pub source: ContextSource,
}

impl CompanyContext {
    pub fn missing() -> Self {
        Self {
            company: None,
            source: ContextSource::Missing,
        }
    }

    pub fn company_id(&self) -> Option<&str> {
        self.company
            .as_ref()?
            .get("id")?
            .as_str()
            .filter(|id| !id.is_empty())
    }

    pub fn has_valid_context(&self) -> bool {
        self.company_id().is_some()
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("No company context available. Generate a company profile first.")]
    Missing,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

#[derive(Clone)]
pub struct CompanyContextResolver {
    api: Arc<ApiClient>,
    cache: Arc<QueryCache>,
    drafts: Arc<DraftStore>,
    auth: Arc<AuthState>,
}

impl CompanyContextResolver {
    pub fn new(
        api: Arc<ApiClient>,
        cache: Arc<QueryCache>,
        drafts: Arc<DraftStore>,
        auth: Arc<AuthState>,
    ) -> Self {
        Self {
            api,
            cache,
            drafts,
            auth,
        }
    }

    /// Resolve the active company. Only consults the namespace matching
    /// the current auth state, so a stale cross-namespace entry can never
    /// satisfy resolution.
    pub async fn resolve(&self) -> Result<CompanyContext, ContextError> {
        let authenticated = self.auth.is_authenticated();
        let overview_key = QueryCache::overview_key(authenticated);

        if let Some(company) = self.cache.get(&overview_key) {
            return Ok(CompanyContext {
                company: Some(company),
                source: ContextSource::Cache,
            });
        }

        if authenticated {
            let records = companies::list_companies(&self.api).await?;
            if let Some(record) = records.first() {
                let company = normalize_entity(EntityType::Company, record);
                self.cache.insert(overview_key, company.clone());
                return Ok(CompanyContext {
                    company: Some(company),
                    source: ContextSource::Remote,
                });
            }
            return Ok(CompanyContext::missing());
        }

        let drafts = self.drafts.get_drafts(EntityType::Company)?;
        if let Some(draft) = drafts.into_iter().next() {
            return Ok(CompanyContext {
                company: Some(draft.data),
                source: ContextSource::Draft,
            });
        }

        Ok(CompanyContext::missing())
    }

    /// Resolve and require a usable company id. Gates pages that cannot
    /// function without one.
    pub async fn require(&self) -> Result<CompanyContext, ContextError> {
        let context = self.resolve().await?;
        if !context.has_valid_context() {
            return Err(ContextError::Missing);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;

    fn build_resolver() -> (tempfile::TempDir, CompanyContextResolver) {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = Arc::new(AuthState::new());
        let api = Arc::new(ApiClient::new(&ClientConfig::default(), auth.clone()));
        let drafts =
            Arc::new(DraftStore::open_at(dir.path().join("playground.db")).unwrap());
        let cache = Arc::new(QueryCache::new());
        let resolver = CompanyContextResolver::new(api, cache, drafts, auth);
        (dir, resolver)
    }

    #[tokio::test]
    async fn test_cached_overview_wins_over_draft() {
        let (_dir, resolver) = build_resolver();
        resolver
            .drafts
            .save_draft(
                EntityType::Company,
                &json!({ "id": "temp_company_1_aa", "companyName": "Draft Co" }),
                None,
            )
            .unwrap();
        resolver.cache.insert(
            QueryCache::overview_key(false),
            json!({ "id": "temp_company_2_bb", "companyName": "Cached Co" }),
        );

        let context = resolver.resolve().await.unwrap();
        assert_eq!(context.source, ContextSource::Cache);
        assert_eq!(context.company_id(), Some("temp_company_2_bb"));
    }

    #[tokio::test]
    async fn test_anonymous_session_falls_back_to_newest_company_draft() {
        let (_dir, resolver) = build_resolver();
        resolver
            .drafts
            .save_draft(
                EntityType::Company,
                &json!({ "id": "temp_company_1_aa", "companyName": "Draft Co" }),
                None,
            )
            .unwrap();

        let context = resolver.resolve().await.unwrap();
        assert_eq!(context.source, ContextSource::Draft);
        assert_eq!(context.company_id(), Some("temp_company_1_aa"));
        assert!(context.has_valid_context());
    }

    #[tokio::test]
    async fn test_no_context_resolves_to_missing() {
        let (_dir, resolver) = build_resolver();
        let context = resolver.resolve().await.unwrap();
        assert_eq!(context.source, ContextSource::Missing);
        assert!(!context.has_valid_context());

        let required = resolver.require().await;
        assert!(matches!(required, Err(ContextError::Missing)));
    }
}
