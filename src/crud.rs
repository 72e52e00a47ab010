//! Entity CRUD facade — the single entry point callers use.
//!
//! Composes the dual-path flow, company-context resolution, and
//! auth-aware navigation. Validation runs before any network or storage
//! work: an account needs a company to attach to, a persona needs its
//! account, a campaign needs its persona and account. Errors carry
//! human-readable guidance so the caller can render a guided empty state
//! instead of attempting an invalid operation.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::auth::AuthState;
use crate::context::{CompanyContext, CompanyContextResolver, ContextError};
use crate::entity::EntityType;
use crate::flow::{CreateRequest, EntityFlow, FlowError};
use crate::nav::{self, RouteSpace};
use crate::types::{
    AccountGenerateRequest, CampaignGenerateRequest, CompanyGenerateRequest,
    PersonaGenerateRequest,
};

/// Options steering a facade create.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Direct parent id: the account for a persona, the persona for a
    /// campaign.
    pub parent_id: Option<String>,
    /// Owning account id, required for campaigns.
    pub account_id: Option<String>,
    /// Bypass company-context resolution with an explicit company id.
    pub custom_company_id: Option<String>,
    /// Compute a route to the new entity on success.
    pub navigate_on_success: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            parent_id: None,
            account_id: None,
            custom_company_id: None,
            navigate_on_success: true,
        }
    }
}

/// The AI request for a facade create. The variant fixes the entity type.
pub enum GenerateInput {
    Company(CompanyGenerateRequest),
    Account(AccountGenerateRequest),
    Persona(PersonaGenerateRequest),
    Campaign(CampaignGenerateRequest),
}

impl GenerateInput {
    pub fn entity_type(&self) -> EntityType {
        match self {
            GenerateInput::Company(_) => EntityType::Company,
            GenerateInput::Account(_) => EntityType::Account,
            GenerateInput::Persona(_) => EntityType::Persona,
            GenerateInput::Campaign(_) => EntityType::Campaign,
        }
    }
}

/// A successful facade create.
#[derive(Debug, Clone)]
pub struct CrudOutcome {
    pub id: String,
    pub entity: Value,
    pub is_temporary: bool,
    /// Route to the new entity, unless navigation was suppressed.
    pub route: Option<String>,
}

#[derive(Debug, Error)]
pub enum CrudError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub struct EntityCrud {
    flow: EntityFlow,
    resolver: CompanyContextResolver,
    auth: Arc<AuthState>,
}

impl EntityCrud {
    pub fn new(
        flow: EntityFlow,
        resolver: CompanyContextResolver,
        auth: Arc<AuthState>,
    ) -> Self {
        Self {
            flow,
            resolver,
            auth,
        }
    }

    /// Validate context, create through the dual-path flow, and compute
    /// the route to the new entity unless suppressed.
    pub async fn create(
        &self,
        input: GenerateInput,
        options: CreateOptions,
    ) -> Result<CrudOutcome, CrudError> {
        let entity_type = input.entity_type();
        let request = self.assemble(input, &options).await?;
        let parent_for_route = request.parent_id().map(str::to_string);
        let outcome = self.flow.create(request).await?;

        let route = if options.navigate_on_success {
            // The route space follows the live auth state, not which path
            // ran, so a mid-flight transition cannot send the caller into
            // the wrong surface.
            let space = RouteSpace::for_auth(self.auth.is_authenticated());
            Some(match (entity_type, parent_for_route) {
                (EntityType::Persona, Some(account_id)) => {
                    nav::persona_route(space, &account_id, &outcome.id)
                }
                _ => nav::entity_route(space, entity_type, &outcome.id),
            })
        } else {
            None
        };

        Ok(CrudOutcome {
            id: outcome.id,
            entity: outcome.entity,
            is_temporary: outcome.is_temporary,
            route,
        })
    }

    /// Field-preserving update, delegated to the flow.
    pub async fn update(
        &self,
        entity_type: EntityType,
        id: &str,
        updates: &Map<String, Value>,
    ) -> Result<Value, CrudError> {
        Ok(self.flow.update(entity_type, id, updates).await?)
    }

    /// Delete, delegated to the flow.
    pub async fn delete(
        &self,
        entity_type: EntityType,
        id: &str,
        parent_id: Option<&str>,
    ) -> Result<(), CrudError> {
        Ok(self.flow.delete(entity_type, id, parent_id).await?)
    }

    /// Resolve context and report the guidance message a create with
    /// these options would fail with, if any.
    pub async fn check_context(
        &self,
        entity_type: EntityType,
        options: &CreateOptions,
    ) -> Result<Option<String>, CrudError> {
        let context = self.resolver.resolve().await?;
        Ok(context_error(entity_type, &context, options))
    }

    async fn assemble(
        &self,
        input: GenerateInput,
        options: &CreateOptions,
    ) -> Result<CreateRequest, CrudError> {
        match input {
            GenerateInput::Company(request) => Ok(CreateRequest::Company(request)),
            GenerateInput::Account(request) => {
                let company_id = match &options.custom_company_id {
                    Some(id) => id.clone(),
                    None => {
                        let context = self.resolver.resolve().await?;
                        context
                            .company_id()
                            .map(str::to_string)
                            .ok_or_else(|| {
                                CrudError::Validation(ACCOUNT_CONTEXT_GUIDANCE.to_string())
                            })?
                    }
                };
                Ok(CreateRequest::Account {
                    company_id,
                    request,
                })
            }
            GenerateInput::Persona(request) => {
                let account_id = options.parent_id.clone().ok_or_else(|| {
                    CrudError::Validation(PERSONA_CONTEXT_GUIDANCE.to_string())
                })?;
                Ok(CreateRequest::Persona {
                    account_id,
                    request,
                })
            }
            GenerateInput::Campaign(request) => {
                let persona_id = options.parent_id.clone().ok_or_else(|| {
                    CrudError::Validation(CAMPAIGN_CONTEXT_GUIDANCE.to_string())
                })?;
                let account_id = options.account_id.clone().ok_or_else(|| {
                    CrudError::Validation(CAMPAIGN_ACCOUNT_GUIDANCE.to_string())
                })?;
                Ok(CreateRequest::Campaign {
                    account_id,
                    persona_id,
                    request,
                })
            }
        }
    }

}

const ACCOUNT_CONTEXT_GUIDANCE: &str =
    "An account profile needs a company to attach to. Generate your company profile first.";
const PERSONA_CONTEXT_GUIDANCE: &str =
    "A persona needs a target account. Create an account profile first.";
const CAMPAIGN_CONTEXT_GUIDANCE: &str =
    "A campaign needs a target persona. Create a persona first.";
const CAMPAIGN_ACCOUNT_GUIDANCE: &str =
    "A campaign needs the persona's owning account. Pass the account id.";

/// True when a create of `entity_type` with these options would pass
/// validation given the resolved context.
pub fn has_required_context(
    entity_type: EntityType,
    context: &CompanyContext,
    options: &CreateOptions,
) -> bool {
    context_error(entity_type, context, options).is_none()
}

/// The guidance message a create would fail with, if any.
pub fn context_error(
    entity_type: EntityType,
    context: &CompanyContext,
    options: &CreateOptions,
) -> Option<String> {
    match entity_type {
        EntityType::Company => None,
        EntityType::Account => {
            if options.custom_company_id.is_some() || context.has_valid_context() {
                None
            } else {
                Some(ACCOUNT_CONTEXT_GUIDANCE.to_string())
            }
        }
        EntityType::Persona => {
            if options.parent_id.is_some() {
                None
            } else {
                Some(PERSONA_CONTEXT_GUIDANCE.to_string())
            }
        }
        EntityType::Campaign => {
            if options.parent_id.is_none() {
                Some(CAMPAIGN_CONTEXT_GUIDANCE.to_string())
            } else if options.account_id.is_none() {
                Some(CAMPAIGN_ACCOUNT_GUIDANCE.to_string())
            } else {
                None
            }
        }
    }
}
