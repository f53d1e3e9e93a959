use axum::extract::State;
use axum::Json;
use safe_core::showcase::ConfigView;
use safe_core::types::AgentRole;
use serde::Deserialize;
use serde_json::{json, Value};

use super::perform;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GuidanceBody {
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String {
    "general technical approach".to_string()
}

/// POST /api/technical_guidance - developer's view on a topic.
pub async fn technical_guidance(
    State(app): State<AppState>,
    Json(body): Json<GuidanceBody>,
) -> Result<Json<Value>, AppError> {
    perform(app, Some("guidance_given"), move |sim| {
        let guidance = sim.technical_guidance(&body.topic)?;
        Ok(json!({ "topic": body.topic, "guidance": guidance }))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct ItemBody {
    pub item: String,
}

/// POST /api/estimate - developer estimate for a product backlog item.
pub async fn estimate(
    State(app): State<AppState>,
    Json(body): Json<ItemBody>,
) -> Result<Json<Value>, AppError> {
    perform(app, Some("story_estimated"), move |sim| {
        sim.estimate_story(&body.item)
    })
    .await
}

/// POST /api/start_work - developer picks up a sprint backlog item.
pub async fn start_work(
    State(app): State<AppState>,
    Json(body): Json<ItemBody>,
) -> Result<Json<Value>, AppError> {
    perform(app, Some("work_started"), move |sim| sim.start_work(&body.item)).await
}

#[derive(Debug, Deserialize)]
pub struct AlignBody {
    #[serde(default)]
    pub epics: Vec<String>,
}

/// POST /api/align_strategy - portfolio and full tiers.
pub async fn align_strategy(
    State(app): State<AppState>,
    Json(body): Json<AlignBody>,
) -> Result<Json<Value>, AppError> {
    perform(app, Some("strategy_aligned"), move |sim| {
        let response = sim.align_with_strategy(&body.epics)?;
        Ok(json!({ "epics": body.epics, "response": response }))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct SolutionTrainBody {
    pub solution: String,
    #[serde(default)]
    pub arts: Vec<String>,
}

/// POST /api/solution_train - full tier only.
pub async fn solution_train(
    State(app): State<AppState>,
    Json(body): Json<SolutionTrainBody>,
) -> Result<Json<Value>, AppError> {
    perform(app, Some("solution_train_coordinated"), move |sim| {
        let response = sim.coordinate_solution_train(&body.solution, &body.arts)?;
        Ok(json!({ "solution": body.solution, "arts": body.arts, "response": response }))
    })
    .await
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QuestionBody {
    pub agent_type: Option<String>,
    pub question: Option<String>,
}

impl QuestionBody {
    fn parse(self) -> Result<(AgentRole, String), AppError> {
        match (self.agent_type, self.question) {
            (Some(agent), Some(question)) if !question.trim().is_empty() => {
                Ok((agent.parse()?, question))
            }
            _ => Err(AppError::bad_request("Missing agent_type or question")),
        }
    }
}

/// POST /api/ask_agent - free-form question, kept in the agent's conversation.
pub async fn ask_agent(
    State(app): State<AppState>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<Value>, AppError> {
    let (role, question) = body.parse()?;
    perform(app, Some("agent_answered"), move |sim| {
        let response = sim.ask_agent(role, &question)?;
        Ok(json!({ "agent": role, "question": question, "response": response }))
    })
    .await
}

/// POST /api/chain_of_thought - step-by-step answer from one agent.
pub async fn chain_of_thought(
    State(app): State<AppState>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<Value>, AppError> {
    let (role, question) = body.parse()?;
    perform(app, Some("reasoning_shared"), move |sim| {
        let reasoning = sim.chain_of_thought(role, &question)?;
        Ok(json!({
            "agent": role,
            "question": question,
            "thought_process": reasoning.thought_process,
            "conclusion": reasoning.conclusion,
        }))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct DemonstrateBody {
    pub config_type: Option<String>,
}

/// POST /api/demonstrate_config - all three agents explain one SAFe view.
pub async fn demonstrate_config(
    State(app): State<AppState>,
    Json(body): Json<DemonstrateBody>,
) -> Result<Json<Value>, AppError> {
    let view: ConfigView = body
        .config_type
        .ok_or_else(|| AppError::bad_request("Missing config_type"))?
        .parse()?;
    perform(app, Some("configuration_demonstrated"), move |sim| {
        sim.demonstrate_configuration(view)
    })
    .await
}
