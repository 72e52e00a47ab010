//! Client data core for the GTMOS go-to-market workspace.
//!
//! GTMOS lets a user generate and refine company, target-account, persona,
//! and campaign profiles against an AI backend. This crate is the data
//! layer under that surface. Its one hard guarantee is shape parity:
//! every entity comes back in the same normalized form whether it was
//! created through the authenticated REST API or saved as an anonymous
//! playground draft, so callers never branch on where data came from and
//! a mid-session sign-up can move local work into the database without
//! loss.
//!
//! `GtmClient::new` wires the subsystems together; `EntityCrud` is the
//! entry point most callers want.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod crud;
pub mod drafts;
pub mod entity;
pub mod flow;
pub mod keycase;
pub mod migrate;
pub mod nav;
pub mod normalize;
pub mod types;

use std::sync::Arc;

pub use crate::api::{ApiClient, ApiError, RateLimitInfo};
pub use crate::auth::{
    AuthProvider, AuthState, AuthStatus, DraftTransition, Session, TokenSource, UserInfo,
};
pub use crate::cache::QueryCache;
pub use crate::config::ClientConfig;
pub use crate::context::{CompanyContext, CompanyContextResolver};
pub use crate::crud::{CreateOptions, CrudError, CrudOutcome, EntityCrud, GenerateInput};
pub use crate::drafts::{Draft, DraftError, DraftStore};
pub use crate::entity::EntityType;
pub use crate::flow::{CreateOutcome, CreateRequest, EntityFlow, FlowError};
pub use crate::migrate::MigrationReport;

/// One wired-up client: config, stores, auth, API, and the CRUD facade.
pub struct GtmClient {
    pub config: ClientConfig,
    pub state: Arc<AuthState>,
    pub provider: Arc<AuthProvider>,
    pub api: Arc<ApiClient>,
    pub drafts: Arc<DraftStore>,
    pub cache: Arc<QueryCache>,
    pub flow: EntityFlow,
    pub resolver: CompanyContextResolver,
    pub crud: EntityCrud,
}

impl GtmClient {
    /// Construct and wire every subsystem. The identity provider stays a
    /// caller-supplied seam; call `provider.refresh()` whenever the
    /// underlying session may have changed.
    pub fn new(
        config: ClientConfig,
        source: Arc<dyn TokenSource>,
    ) -> Result<Self, DraftError> {
        let store_path = match &config.playground_db {
            Some(path) => path.clone(),
            None => DraftStore::default_path()?,
        };
        let drafts = Arc::new(DraftStore::open_with_ttl(
            store_path,
            config.draft_ttl_days,
        )?);
        let cache = Arc::new(QueryCache::new());
        let state = Arc::new(AuthState::new());
        let api = Arc::new(ApiClient::new(&config, state.clone()));

        let provider = Arc::new(AuthProvider::new(
            state.clone(),
            source,
            drafts.clone(),
            cache.clone(),
            config.draft_transition,
        ));
        provider.attach_api(api.clone());

        let flow = EntityFlow::new(api.clone(), drafts.clone(), cache.clone(), state.clone());
        let resolver = CompanyContextResolver::new(
            api.clone(),
            cache.clone(),
            drafts.clone(),
            state.clone(),
        );
        let crud = EntityCrud::new(flow.clone(), resolver.clone(), state.clone());

        Ok(Self {
            config,
            state,
            provider,
            api,
            drafts,
            cache,
            flow,
            resolver,
            crud,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoSession;

    #[async_trait]
    impl TokenSource for NoSession {
        async fn fetch_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_client_wires_up_and_runs_playground_operations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ClientConfig {
            playground_db: Some(dir.path().join("playground.db")),
            ..Default::default()
        };

        let client = GtmClient::new(config, Arc::new(NoSession)).unwrap();
        client.provider.refresh().await.unwrap();
        assert!(!client.state.is_authenticated());

        // Anonymous sessions resolve company context from drafts.
        client
            .drafts
            .save_draft(
                EntityType::Company,
                &json!({ "id": "temp_company_1_aa", "companyName": "Draft Co" }),
                None,
            )
            .unwrap();
        let context = client.resolver.resolve().await.unwrap();
        assert_eq!(context.company_id(), Some("temp_company_1_aa"));
    }
}
