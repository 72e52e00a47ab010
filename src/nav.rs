//! Auth-aware route computation.
//!
//! Pure functions: the `/app` vs `/playground` prefix follows auth state,
//! per-entity segments come from the descriptor table, and nested paths
//! compose parent and child templates.

use crate::entity::{descriptor, EntityType};

/// Which route space the session lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSpace {
    App,
    Playground,
}

impl RouteSpace {
    pub fn for_auth(authenticated: bool) -> Self {
        if authenticated {
            RouteSpace::App
        } else {
            RouteSpace::Playground
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            RouteSpace::App => "/app",
            RouteSpace::Playground => "/playground",
        }
    }
}

/// Route to an entity's list page.
pub fn entity_list_route(space: RouteSpace, entity_type: EntityType) -> String {
    format!("{}/{}", space.prefix(), descriptor(entity_type).route_template)
}

/// Route to a single entity's page.
pub fn entity_route(space: RouteSpace, entity_type: EntityType, id: &str) -> String {
    format!(
        "{}/{}/{}",
        space.prefix(),
        descriptor(entity_type).route_template,
        id
    )
}

/// Route to a persona nested under its owning account.
pub fn persona_route(space: RouteSpace, account_id: &str, persona_id: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        space.prefix(),
        descriptor(EntityType::Account).route_template,
        account_id,
        descriptor(EntityType::Persona).route_template,
        persona_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_follows_auth_state() {
        assert_eq!(RouteSpace::for_auth(true), RouteSpace::App);
        assert_eq!(RouteSpace::for_auth(false), RouteSpace::Playground);
    }

    #[test]
    fn test_entity_routes() {
        assert_eq!(
            entity_route(RouteSpace::App, EntityType::Account, "acct_1"),
            "/app/accounts/acct_1"
        );
        assert_eq!(
            entity_route(
                RouteSpace::Playground,
                EntityType::Campaign,
                "temp_campaign_1_ab"
            ),
            "/playground/campaigns/temp_campaign_1_ab"
        );
        assert_eq!(
            entity_list_route(RouteSpace::App, EntityType::Company),
            "/app/company"
        );
    }

    #[test]
    fn test_nested_persona_route_composes_templates() {
        assert_eq!(
            persona_route(RouteSpace::Playground, "acct_1", "pers_1"),
            "/playground/accounts/acct_1/personas/pers_1"
        );
    }
}
