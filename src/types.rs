//! Shared type definitions for the entity data layer.
//!
//! Normalized entities are the canonical in-memory shape: flat camelCase,
//! every payload key promoted to the top level, typed sub-structures with
//! defaults so callers never null-check known fields, and the camelCased
//! payload retained under `data`. Unknown promoted keys ride in `extra`
//! via serde flatten so a round trip loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::is_temp_id;

// ============================================================================
// Payload sub-structures
// ============================================================================

/// Firmographic targeting criteria for an account profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Firmographics {
    pub industry: Vec<String>,
    pub employees: String,
    pub revenue: String,
    pub geography: Vec<String>,
    pub business_model: Vec<String>,
    pub funding_stage: Vec<String>,
    pub keywords: Vec<String>,
}

/// A detectable indicator that an account or persona is in-market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyingSignal {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub priority: String,
    pub detection_method: String,
}

/// Who the persona is inside the target account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Demographics {
    pub job_titles: Vec<String>,
    pub departments: Vec<String>,
    pub seniority: Vec<String>,
    pub buying_roles: Vec<String>,
    pub job_description_keywords: Vec<String>,
}

/// A persona use case mapping pain to capability to outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UseCase {
    pub use_case: String,
    pub pain_points: String,
    pub capability: String,
    pub desired_outcome: String,
}

/// Campaign subject lines. The primary subject doubles as the campaign's
/// display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSubjects {
    pub primary: String,
    pub alternatives: Vec<String>,
}

/// One block of generated email copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSegment {
    #[serde(rename = "type")]
    pub segment_type: String,
    pub text: String,
}

// ============================================================================
// Normalized entities
// ============================================================================

/// The user's company profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedCompany {
    pub id: String,
    pub company_name: String,
    pub company_url: String,
    pub description: String,
    pub business_profile_insights: Vec<String>,
    pub capabilities: Vec<String>,
    pub use_case_analysis_insights: Vec<String>,
    pub positioning_insights: Vec<String>,
    pub objections: Vec<String>,
    /// CamelCased original payload, retained verbatim.
    pub data: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedCompany {
    pub fn is_draft(&self) -> bool {
        is_temp_id(&self.id)
    }
}

/// A target account profile under a company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedAccount {
    pub id: String,
    pub company_id: String,
    pub target_account_name: String,
    pub target_account_description: String,
    pub target_account_rationale: Vec<String>,
    pub firmographics: Firmographics,
    pub buying_signals: Vec<BuyingSignal>,
    pub buying_signals_rationale: Vec<String>,
    pub data: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedAccount {
    pub fn is_draft(&self) -> bool {
        is_temp_id(&self.id)
    }
}

/// A buyer persona under a target account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedPersona {
    pub id: String,
    pub account_id: String,
    pub target_persona_name: String,
    pub target_persona_description: String,
    pub target_persona_rationale: Vec<String>,
    pub demographics: Demographics,
    pub use_cases: Vec<UseCase>,
    pub buying_signals: Vec<BuyingSignal>,
    pub objections: Vec<String>,
    pub goals: Vec<String>,
    pub purchase_journey: Vec<String>,
    pub data: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedPersona {
    pub fn is_draft(&self) -> bool {
        is_temp_id(&self.id)
    }
}

/// An email campaign generated for a persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedCampaign {
    pub id: String,
    pub account_id: String,
    pub persona_id: String,
    /// Derived display name: the primary subject line.
    pub campaign_name: String,
    pub subjects: EmailSubjects,
    pub segments: Vec<EmailSegment>,
    pub writing_process: Map<String, Value>,
    pub data: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NormalizedCampaign {
    pub fn is_draft(&self) -> bool {
        is_temp_id(&self.id)
    }
}

// ============================================================================
// AI generation requests
// ============================================================================

/// Request body for `POST .../companies/generate-ai`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyGenerateRequest {
    pub website_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_inputted_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_context: Option<Map<String, Value>>,
}

/// Request body for `POST .../accounts/generate-ai`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountGenerateRequest {
    pub website_url: String,
    pub account_profile_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypothesis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    pub company_context: Map<String, Value>,
}

/// Request body for `POST .../accounts/{id}/personas/generate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonaGenerateRequest {
    pub website_url: String,
    pub persona_profile_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypothesis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    pub company_context: Map<String, Value>,
    pub target_account_context: Map<String, Value>,
}

/// Caller preferences steering campaign copy generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignPreferences {
    pub use_case: String,
    pub emphasis: String,
    pub opening_line: String,
    pub cta: String,
    pub template: String,
}

/// Request body for `POST .../campaigns/generate-ai`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignGenerateRequest {
    pub company_context: Map<String, Value>,
    pub target_account: Map<String, Value>,
    pub target_persona: Map<String, Value>,
    pub preferences: CampaignPreferences,
}
