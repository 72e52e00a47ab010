//! Authentication state and transition handling.
//!
//! `AuthState` is an explicit, injectable snapshot of the current session:
//! plain service code holds an `Arc<AuthState>` and reads auth status and
//! the bearer token without any reactive machinery. `AuthProvider` owns
//! refreshing that snapshot from an opaque identity provider and applying
//! the cache/draft effects of every transition:
//!
//! - sign-in (and user swap): playground drafts are cleared — or migrated
//!   first when `MigrateOnLogin` is configured — and playground cache
//!   entries purged, so stale local data never contaminates the
//!   authenticated view;
//! - sign-out: only `db_`-namespaced cache entries are purged, playground
//!   data is untouched.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiClient;
use crate::cache::QueryCache;
use crate::drafts::{DraftError, DraftStore};

/// Errors from session refresh and transition handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Draft store error: {0}")]
    Drafts(#[from] DraftError),
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// A token fetch is in flight; callers should treat this as
    /// not-yet-known rather than anonymous.
    Loading,
    Anonymous,
    Authenticated,
}

/// The authenticated user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A live session: bearer token plus who it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserInfo,
}

/// Point-in-time view of auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub status: AuthStatus,
    pub token: Option<String>,
    pub user: Option<UserInfo>,
}

impl AuthSnapshot {
    pub fn loading() -> Self {
        Self {
            status: AuthStatus::Loading,
            token: None,
            user: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            token: None,
            user: None,
        }
    }

    pub fn authenticated(session: Session) -> Self {
        Self {
            status: AuthStatus::Authenticated,
            token: Some(session.token),
            user: Some(session.user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }

    fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }
}

/// Opaque identity provider seam. `None` means no active session.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_session(&self) -> Result<Option<Session>, AuthError>;
}

/// Shared, injectable snapshot holder. Service code reads; only the
/// provider writes.
pub struct AuthState {
    inner: RwLock<AuthSnapshot>,
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AuthSnapshot::loading()),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_authenticated()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    pub(crate) fn store(&self, snapshot: AuthSnapshot) {
        *self.inner.write() = snapshot;
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// What happens to playground drafts when the user signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftTransition {
    /// Delete drafts outright (default).
    ClearOnLogin,
    /// Best-effort copy into the backend first, then delete.
    MigrateOnLogin,
}

/// A detected change in authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTransition {
    SignedIn,
    SignedOut,
    UserChanged,
}

/// Refreshes the auth snapshot and applies transition effects.
pub struct AuthProvider {
    state: Arc<AuthState>,
    source: Arc<dyn TokenSource>,
    drafts: Arc<DraftStore>,
    cache: Arc<QueryCache>,
    strategy: DraftTransition,
    api: OnceLock<Arc<ApiClient>>,
}

impl AuthProvider {
    pub fn new(
        state: Arc<AuthState>,
        source: Arc<dyn TokenSource>,
        drafts: Arc<DraftStore>,
        cache: Arc<QueryCache>,
        strategy: DraftTransition,
    ) -> Self {
        Self {
            state,
            source,
            drafts,
            cache,
            strategy,
            api: OnceLock::new(),
        }
    }

    /// Attach the API client used by `MigrateOnLogin`. Constructed after
    /// the provider because the client reads the same `AuthState`.
    pub fn attach_api(&self, api: Arc<ApiClient>) {
        let _ = self.api.set(api);
    }

    pub fn state(&self) -> Arc<AuthState> {
        self.state.clone()
    }

    /// Re-fetch the session from the identity provider, publish the new
    /// snapshot, and apply transition effects. Returns the transition that
    /// occurred, if any.
    pub async fn refresh(&self) -> Result<Option<AuthTransition>, AuthError> {
        let previous = self.state.snapshot();
        self.state.store(AuthSnapshot {
            status: AuthStatus::Loading,
            ..previous.clone()
        });

        let next = match self.source.fetch_session().await {
            Ok(Some(session)) => AuthSnapshot::authenticated(session),
            Ok(None) => AuthSnapshot::anonymous(),
            Err(e) => {
                // Restore the pre-fetch snapshot so a flaky provider
                // doesn't strand callers in Loading.
                self.state.store(previous);
                return Err(e);
            }
        };

        let transition = classify_transition(&previous, &next);
        // Publish before effects: migration must run with the new token.
        self.state.store(next);

        if let Some(transition) = transition {
            self.apply_transition(transition).await?;
        }
        Ok(transition)
    }

    async fn apply_transition(&self, transition: AuthTransition) -> Result<(), AuthError> {
        match transition {
            AuthTransition::SignedIn | AuthTransition::UserChanged => {
                if self.strategy == DraftTransition::MigrateOnLogin {
                    match self.api.get() {
                        Some(api) => {
                            let report =
                                crate::migrate::migrate_drafts_to_db(&self.drafts, api).await;
                            log::info!(
                                "draft migration: {} migrated, {} failed",
                                report.migrated,
                                report.failed
                            );
                        }
                        None => log::warn!(
                            "migrate-on-login configured but no API client attached; clearing drafts"
                        ),
                    }
                }
                self.drafts.clear_all_drafts()?;
                let purged = self.cache.purge_playground();
                // A user swap also invalidates the previous user's
                // server-backed entries.
                if transition == AuthTransition::UserChanged {
                    self.cache.purge_authenticated();
                }
                log::info!("signed in: cleared playground drafts, purged {purged} cache entries");
            }
            AuthTransition::SignedOut => {
                let purged = self.cache.purge_authenticated();
                log::info!("signed out: purged {purged} authenticated cache entries");
            }
        }
        Ok(())
    }
}

fn classify_transition(
    previous: &AuthSnapshot,
    next: &AuthSnapshot,
) -> Option<AuthTransition> {
    match (previous.is_authenticated(), next.is_authenticated()) {
        (false, true) => Some(AuthTransition::SignedIn),
        (true, false) => Some(AuthTransition::SignedOut),
        (true, true) if previous.user_id() != next.user_id() => {
            Some(AuthTransition::UserChanged)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubSource {
        session: parking_lot::Mutex<Option<Session>>,
    }

    impl StubSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                session: parking_lot::Mutex::new(None),
            })
        }

        fn set(&self, session: Option<Session>) {
            *self.session.lock() = session;
        }
    }

    #[async_trait]
    impl TokenSource for StubSource {
        async fn fetch_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(self.session.lock().clone())
        }
    }

    fn session(user_id: &str) -> Session {
        Session {
            token: format!("tok_{user_id}"),
            user: UserInfo {
                user_id: user_id.to_string(),
                email: None,
            },
        }
    }

    fn build_provider() -> (tempfile::TempDir, Arc<StubSource>, AuthProvider) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().expect("tempdir");
        let drafts =
            Arc::new(DraftStore::open_at(dir.path().join("playground.db")).unwrap());
        let cache = Arc::new(QueryCache::new());
        let source = StubSource::new();
        let provider = AuthProvider::new(
            Arc::new(AuthState::new()),
            source.clone(),
            drafts,
            cache,
            DraftTransition::ClearOnLogin,
        );
        (dir, source, provider)
    }

    #[tokio::test]
    async fn test_initial_anonymous_refresh_is_not_a_transition() {
        let (_dir, _source, provider) = build_provider();
        let transition = provider.refresh().await.unwrap();
        assert_eq!(transition, None);
        assert_eq!(provider.state.snapshot().status, AuthStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_sign_in_clears_playground_drafts_and_cache() {
        let (_dir, source, provider) = build_provider();
        provider.refresh().await.unwrap();

        for t in crate::entity::EntityType::ALL {
            provider.drafts.save_draft(t, &json!({}), None).unwrap();
        }
        provider
            .cache
            .insert("account_temp_1".into(), json!({ "id": "temp_1" }));
        provider
            .cache
            .insert("db_account_1".into(), json!({ "id": "1" }));

        source.set(Some(session("user_1")));
        let transition = provider.refresh().await.unwrap();
        assert_eq!(transition, Some(AuthTransition::SignedIn));

        for t in crate::entity::EntityType::ALL {
            assert!(provider.drafts.get_drafts(t).unwrap().is_empty());
        }
        assert!(provider.cache.get("account_temp_1").is_none());
        assert!(provider.cache.get("db_account_1").is_some());
        assert_eq!(
            provider.state.bearer_token().as_deref(),
            Some("tok_user_1")
        );
    }

    #[tokio::test]
    async fn test_sign_out_purges_only_authenticated_cache() {
        let (_dir, source, provider) = build_provider();
        source.set(Some(session("user_1")));
        provider.refresh().await.unwrap();

        provider
            .cache
            .insert("db_account_1".into(), json!({ "id": "1" }));
        provider
            .cache
            .insert("company_overview".into(), json!({ "id": "temp_c" }));
        provider
            .drafts
            .save_draft(crate::entity::EntityType::Company, &json!({}), None)
            .unwrap();

        source.set(None);
        let transition = provider.refresh().await.unwrap();
        assert_eq!(transition, Some(AuthTransition::SignedOut));

        assert!(provider.cache.get("db_account_1").is_none());
        assert!(provider.cache.get("company_overview").is_some());
        // Playground data is untouched on sign-out.
        assert_eq!(
            provider
                .drafts
                .get_drafts(crate::entity::EntityType::Company)
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_user_swap_invalidates_both_namespaces() {
        let (_dir, source, provider) = build_provider();
        source.set(Some(session("user_1")));
        provider.refresh().await.unwrap();

        provider
            .cache
            .insert("db_account_1".into(), json!({ "id": "1" }));

        source.set(Some(session("user_2")));
        let transition = provider.refresh().await.unwrap();
        assert_eq!(transition, Some(AuthTransition::UserChanged));
        assert!(provider.cache.get("db_account_1").is_none());
        assert_eq!(
            provider.state.bearer_token().as_deref(),
            Some("tok_user_2")
        );
    }

    #[tokio::test]
    async fn test_provider_error_restores_previous_snapshot() {
        struct FailingSource;

        #[async_trait]
        impl TokenSource for FailingSource {
            async fn fetch_session(&self) -> Result<Option<Session>, AuthError> {
                Err(AuthError::Provider("identity service unreachable".into()))
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let provider = AuthProvider::new(
            Arc::new(AuthState::new()),
            Arc::new(FailingSource),
            Arc::new(DraftStore::open_at(dir.path().join("p.db")).unwrap()),
            Arc::new(QueryCache::new()),
            DraftTransition::ClearOnLogin,
        );

        assert!(provider.refresh().await.is_err());
        assert_eq!(provider.state.snapshot().status, AuthStatus::Loading);
    }
}
