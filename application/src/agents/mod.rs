//! The agent contract and its shared think-cycle
//!
//! Every agent supplies three hooks (`prepare_input`, `parse`, `degrade`)
//! and inherits the canonical think-cycle: assemble the prompt,
//! invoke the model through the slot, extract JSON, parse into a typed
//! output, and degrade gracefully on exhaustion. The cycle never unwinds
//! past the engine; every failure becomes an error record plus a typed
//! degraded output.

pub mod auditor;
pub mod grounder;
pub mod interpreter;
pub mod judge;
pub mod planner;
pub mod visualizer;

use crate::config::EngineConfig;
use crate::deadline::Deadline;
use crate::ports::model_runtime::{GenerationRequest, RuntimeError};
use crate::ports::progress::PipelineProgress;
use crate::slot::ModelSlot;
use async_trait::async_trait;
use colloquy_domain::{extract_json, AgentId, AgentOutput, ModelDescriptor, PromptAssembler, SharedState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reason a model response was rejected by an agent's parser.
#[derive(Debug, Clone)]
pub struct ParseReject(pub String);

impl ParseReject {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl std::fmt::Display for ParseReject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything an agent needs from the engine for one step.
pub struct AgentContext<'a> {
    pub slot: &'a ModelSlot,
    pub config: &'a EngineConfig,
    pub deadline: Deadline,
    pub cancel: &'a CancellationToken,
    pub progress: &'a dyn PipelineProgress,
}

/// A pipeline agent.
///
/// The default [`execute`](Agent::execute) runs the shared think-cycle; only
/// the Grounder overrides it, to interleave evidence retrieval and a
/// per-question generation loop.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn model(&self) -> &ModelDescriptor;

    /// Static prompt template; exact wording is not load-bearing.
    fn template(&self) -> &str;

    /// Shape the subset of shared state this agent reads into the prompt's
    /// input fragment.
    fn prepare_input(&self, state: &SharedState) -> serde_json::Value;

    /// Convert an extracted JSON object into this agent's typed output.
    fn parse(&self, raw: &serde_json::Value, state: &SharedState)
        -> Result<AgentOutput, ParseReject>;

    /// Typed fallback when generation or parsing is exhausted.
    fn degrade(&self, state: &SharedState) -> AgentOutput;

    /// Run one full step, recording results and errors into `state`.
    async fn execute(&self, state: &mut SharedState, cx: &AgentContext<'_>) -> AgentOutput {
        think(self, state, cx).await
    }
}

/// The canonical think-cycle shared by every agent.
pub async fn think<A>(agent: &A, state: &mut SharedState, cx: &AgentContext<'_>) -> AgentOutput
where
    A: Agent + ?Sized,
{
    info!(agent = %agent.id(), model = %agent.model().id, "Agent thinking");

    match run_cycle(agent, state, cx).await {
        Ok((output, raw)) => {
            info!(agent = %agent.id(), "Agent produced output");
            state.record_raw_output(agent.id(), raw);
            output
        }
        Err(message) => {
            warn!(agent = %agent.id(), %message, "Agent degraded");
            state.record_error(agent.id(), message);
            let degraded = agent.degrade(state);
            if let Ok(raw) = serde_json::to_value(&degraded) {
                state.record_raw_output(agent.id(), raw);
            }
            degraded
        }
    }
}

/// Assemble, invoke, extract, and parse, with parse-retry.
async fn run_cycle<A>(
    agent: &A,
    state: &SharedState,
    cx: &AgentContext<'_>,
) -> Result<(AgentOutput, serde_json::Value), String>
where
    A: Agent + ?Sized,
{
    let input = agent.prepare_input(state);
    let base_prompt = PromptAssembler::assemble(agent.template(), &input);
    let attempts = cx.config.max_parse_retries + 1;
    let mut prompt = base_prompt.clone();

    for attempt in 1..=attempts {
        if cx.deadline.is_expired() {
            return Err("deadline expired".to_string());
        }
        debug!(agent = %agent.id(), attempt, "Generating");

        let response = generate(agent.model(), &prompt, cx).await?;

        match extract_json(&response) {
            Some(raw) => match agent.parse(&raw, state) {
                Ok(output) => return Ok((output, raw)),
                Err(reject) => {
                    warn!(agent = %agent.id(), attempt, reason = %reject, "Parse rejected")
                }
            },
            None => warn!(agent = %agent.id(), attempt, "No JSON object in response"),
        }

        if attempt < attempts {
            prompt = format!("{base_prompt}{}", PromptAssembler::json_retry_suffix());
        }
    }

    Err(format!("no parseable output after {attempts} attempts"))
}

/// One generation under the model slot, raced against cancellation and the
/// step deadline. Slot and runtime failures are fatal for the cycle;
/// parse-retry does not apply to them.
pub(crate) async fn generate(
    model: &ModelDescriptor,
    prompt: &str,
    cx: &AgentContext<'_>,
) -> Result<String, String> {
    let request =
        GenerationRequest::for_model(model, prompt, cx.deadline.bounded(cx.config.generate_timeout));
    let cancel = cx.cancel;
    let deadline = cx.deadline;

    let result = cx
        .slot
        .with_model(model, cx.deadline, cx.cancel, move |runtime| async move {
            tokio::select! {
                result = runtime.generate(request) => result,
                _ = cancel.cancelled() => Err(RuntimeError::Timeout),
                _ = tokio::time::sleep_until(deadline.instant()) => Err(RuntimeError::Timeout),
            }
        })
        .await;

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}
