//! The generation round trip: targets, prompt, external generator, parse,
//! history, validation.

use tracing::{info, warn};
use uuid::Uuid;

use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::{InputMessage, Provider, ResponsesRequest, TextOptions};
use crate::config::GenerationSettings;
use crate::error::PlannerError;
use crate::planning::RecipeTargetRequest;
use crate::prompt::{build_prompt, planning_tsv, Prompt};
use crate::recipe_parser::{parse_plan_text, RecipePlan};
use crate::state::{AppState, DEFAULT_SIGNATURE_LIMIT};
use crate::validator::{validate_plan, ValidationIssue};

/// Anything that turns a prompt into raw plan text.
///
/// Calls are independent; abandoning the future cancels the attempt.
#[allow(async_fn_in_trait)]
pub trait PlanGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ApiConnectionError>;
}

/// Generator backed by the OpenAI Responses API.
pub struct OpenAiGenerator {
    provider: Provider,
    settings: GenerationSettings,
}

impl OpenAiGenerator {
    pub fn new(provider: Provider, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn request_for(&self, prompt: &Prompt) -> ResponsesRequest {
        ResponsesRequest {
            model: self.settings.model.clone(),
            input: vec![
                InputMessage::system(prompt.system.clone()),
                InputMessage::user(prompt.user.clone()),
            ],
            temperature: Some(self.settings.temperature),
            max_output_tokens: Some(self.settings.max_tokens),
            text: Some(TextOptions::json_object()),
        }
    }
}

impl PlanGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ApiConnectionError> {
        self.provider.call_responses(&self.request_for(prompt)).await
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub history_id: Uuid,
    pub requests: Vec<RecipeTargetRequest>,
    pub plan: RecipePlan,
    /// Advisory findings; the plan is stored regardless.
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// No active profile has a checked meal.
    NothingToGenerate,
    Generated(GeneratedPlan),
}

/// Runs one generation attempt against `state`.
///
/// On success the plan is appended to the history (the caller persists the
/// state) and validated against the signatures known before this attempt.
/// Generator and parse failures leave `state` untouched.
pub async fn generate_plan<G: PlanGenerator>(generator: &G, state: &mut AppState) -> Result<GenerationOutcome, PlannerError> {
    let requests = state.derive_targets();
    if requests.is_empty() {
        info!("Nothing checked in the planning, skipping generation");
        return Ok(GenerationOutcome::NothingToGenerate);
    }

    let seen = state.last_signatures(DEFAULT_SIGNATURE_LIMIT);
    let prompt = build_prompt(&planning_tsv(state), &requests, &state.rules, &seen);
    info!("Requesting {} recipe(s) from the generator", requests.len());

    let text = generator.generate(&prompt).await?;
    let plan = parse_plan_text(&text).map_err(PlannerError::Parse)?;
    if plan.recipes.len() != requests.len() {
        warn!(
            "Asked for {} recipe(s), generator returned {}",
            requests.len(),
            plan.recipes.len()
        );
    }

    let history_id = state.add_history_entry(&plan);
    let issues = validate_plan(&plan, &state.rules, &seen);
    for issue in &issues {
        warn!("{}", issue);
    }

    Ok(GenerationOutcome::Generated(GeneratedPlan {
        history_id,
        requests,
        plan,
        issues,
    }))
}
