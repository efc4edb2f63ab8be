//! Pipeline engine
//!
//! Sequences agents per execution mode, applies per-agent quality gates,
//! drives the deliberation loop when the Judge requests revision, and
//! guarantees the run always completes with a `SharedState`. The engine is
//! the only component whose failures can halt a run, and only for
//! configuration errors or an unregistered agent.

use crate::agents::{Agent, AgentContext};
use crate::config::{ConfigError, EngineConfig};
use crate::deadline::Deadline;
use crate::ports::progress::{NoProgress, PipelineProgress};
use crate::slot::ModelSlot;
use colloquy_domain::{AgentId, AgentOutput, Brief, JudgeDecision, Mode, SharedState};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors that halt a run before or during sequencing.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Agent {0} is not registered for the selected mode")]
    AgentNotRegistered(AgentId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Input to a single pipeline run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub brief: Brief,
    pub mode: Mode,
    pub clarifications: BTreeMap<String, String>,
    pub session_id: String,
    /// Overall wall-clock budget; unbounded when absent
    pub overall_budget: Option<Duration>,
}

impl RunRequest {
    pub fn new(brief: Brief, mode: Mode, session_id: impl Into<String>) -> Self {
        Self {
            brief,
            mode,
            clarifications: BTreeMap::new(),
            session_id: session_id.into(),
            overall_budget: None,
        }
    }

    pub fn with_clarifications(mut self, clarifications: BTreeMap<String, String>) -> Self {
        self.clarifications = clarifications;
        self
    }

    pub fn with_overall_budget(mut self, budget: Duration) -> Self {
        self.overall_budget = Some(budget);
        self
    }
}

/// The deliberation pipeline engine.
pub struct PipelineEngine {
    agents: BTreeMap<AgentId, Arc<dyn Agent>>,
    slot: Arc<ModelSlot>,
    config: EngineConfig,
    progress: Arc<dyn PipelineProgress>,
    cancel: CancellationToken,
}

impl PipelineEngine {
    /// Create an engine. Refuses invalid configuration.
    pub fn new(slot: Arc<ModelSlot>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            agents: BTreeMap::new(),
            slot,
            config,
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn PipelineProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Register an agent under its id. Later registrations win.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.id(), agent);
    }

    /// Token the front-end can use to cancel the run cooperatively.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute a full run. Always returns a `SharedState` unless the mode's
    /// agents are not all registered.
    pub async fn run(&self, request: RunRequest) -> Result<SharedState, EngineError> {
        let sequence = request.mode.agent_sequence();
        for id in sequence {
            if !self.agents.contains_key(id) {
                return Err(EngineError::AgentNotRegistered(*id));
            }
        }

        let overall = request
            .overall_budget
            .map(Deadline::after)
            .unwrap_or_else(Deadline::unbounded);
        let mut state = SharedState::new(
            request.brief.content(),
            request.mode,
            request.clarifications,
            request.session_id,
        );

        info!(
            mode = %request.mode,
            session = %state.session_id,
            steps = sequence.len(),
            "Starting pipeline"
        );
        self.progress.on_pipeline_start(request.mode, sequence);

        let mut decision = self.run_sequence(&mut state, sequence, overall).await;

        while decision == Some(JudgeDecision::NeedsRevision)
            && state.deliberation_round < self.config.max_deliberation_rounds
            && !self.cancel.is_cancelled()
            && !overall.is_expired()
        {
            state.deliberation_round += 1;
            info!(round = state.deliberation_round, "Judge requested revision");
            self.progress.on_deliberation_round(state.deliberation_round);
            decision = self
                .run_sequence(&mut state, request.mode.revision_sequence(), overall)
                .await;
        }

        state.completed_at = Some(chrono::Utc::now());
        self.slot.release().await;
        info!(
            session = %state.session_id,
            rounds = state.deliberation_round,
            errors = state.errors.len(),
            "Pipeline completed"
        );
        Ok(state)
    }

    /// Run one agent sequence, returning the Judge's decision if it ran.
    async fn run_sequence(
        &self,
        state: &mut SharedState,
        sequence: &[AgentId],
        overall: Deadline,
    ) -> Option<JudgeDecision> {
        let mut decision = None;

        for id in sequence {
            if self.cancel.is_cancelled() {
                info!(agent = %id, "Cancelled; stopping before agent");
                break;
            }
            if overall.is_expired() {
                state.record_error(*id, "overall deadline expired before this agent ran");
                break;
            }

            let agent = Arc::clone(self.agents.get(id).expect("registration checked in run"));
            self.progress.on_agent_start(*id);

            let step_deadline = overall.min(Deadline::after(self.config.agent_time_budget));
            let errors_before = state.errors.len();
            let cx = AgentContext {
                slot: self.slot.as_ref(),
                config: &self.config,
                deadline: step_deadline,
                cancel: &self.cancel,
                progress: self.progress.as_ref(),
            };

            let output = agent.execute(state, &cx).await;
            if let AgentOutput::Judge(verdict) = &output {
                decision = Some(verdict.decision);
            }
            state.apply_output(output);

            let degraded = state.errors.len() > errors_before;
            if let Err(reason) = quality_gate(*id, state) {
                warn!(agent = %id, %reason, "Quality gate rejected output");
                self.progress.on_gate_rejected(*id, &reason);
                state.record_error(*id, format!("quality gate rejected: {reason}"));
            }
            self.progress.on_agent_complete(*id, degraded);
        }

        decision
    }
}

/// Per-agent acceptance predicate, evaluated after the think-cycle returns.
/// A rejection records an error but never halts the pipeline.
fn quality_gate(agent: AgentId, state: &SharedState) -> Result<(), String> {
    match agent {
        AgentId::Interpreter => {
            let intent = state.intent.as_ref().ok_or("intent not produced")?;
            if intent.primary_goal.trim().is_empty() {
                return Err("primary_goal is empty".to_string());
            }
            Ok(())
        }
        AgentId::Planner => {
            let plan = state.plan.as_ref().ok_or("plan not produced")?;
            plan.validate().map_err(|e| e.to_string())
        }
        AgentId::Grounder => {
            if state.research_findings.is_empty() {
                return Err("no research findings produced".to_string());
            }
            let ungrounded = state.research_findings.iter().any(|finding| {
                !finding.answer.trim().is_empty() && !finding.has_citations()
            });
            if ungrounded && !state.has_error_for(AgentId::Grounder) {
                return Err("uncited answer without a recorded warning".to_string());
            }
            Ok(())
        }
        AgentId::Auditor => {
            state.audit_report.as_ref().ok_or("audit report not produced")?;
            Ok(())
        }
        AgentId::Visualizer => {
            state
                .visualizations
                .as_ref()
                .ok_or("visualizations not produced")?;
            Ok(())
        }
        AgentId::Judge => {
            let artifact = state
                .final_artifact
                .as_ref()
                .ok_or("final artifact not produced")?;
            if artifact.sections.is_empty() {
                return Err("final artifact has no sections".to_string());
            }
            let score = state.consensus_score.ok_or("consensus score not set")?;
            if !(0.0..=1.0).contains(&score) {
                return Err(format!("consensus score out of range: {score}"));
            }
            Ok(())
        }
    }
}

/// Whether the finished run's artifact passed the Judge's quality gate.
/// The front-end maps a completed-but-failing run to its own exit status.
pub fn artifact_accepted(state: &SharedState) -> bool {
    quality_gate(AgentId::Judge, state).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{
        auditor::Auditor, grounder::Grounder, interpreter::Interpreter, judge::Judge,
        planner::Planner,
    };
    use crate::ports::model_runtime::{GenerationRequest, ModelRuntime, RuntimeError};
    use crate::ports::vector_store::{StoreError, VectorHit, VectorStore};
    use crate::ports::web_search::{SearchError, SearchHit, WebSearch};
    use crate::retrieval::EvidenceRetriever;
    use async_trait::async_trait;
    use colloquy_domain::ModelDescriptor;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const INTERPRETER_MODEL: &str = "stub-interpreter";
    const PLANNER_MODEL: &str = "stub-planner";
    const GROUNDER_MODEL: &str = "stub-grounder";
    const AUDITOR_MODEL: &str = "stub-auditor";
    const JUDGE_MODEL: &str = "stub-judge";

    /// Deterministic scripted runtime: per-model response queues, per-model
    /// generation delays, and a set of models whose load always fails.
    struct ScriptedRuntime {
        responses: Mutex<HashMap<String, VecDeque<String>>>,
        absent: HashSet<String>,
        delays: HashMap<String, Duration>,
        calls: Mutex<HashMap<String, u32>>,
        load_attempts: AtomicU32,
    }

    impl ScriptedRuntime {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                absent: HashSet::new(),
                delays: HashMap::new(),
                calls: Mutex::new(HashMap::new()),
                load_attempts: AtomicU32::new(0),
            }
        }

        fn script(mut self, model: &str, responses: Vec<String>) -> Self {
            self.responses
                .get_mut()
                .unwrap()
                .entry(model.to_string())
                .or_default()
                .extend(responses);
            self
        }

        fn with_absent(mut self, model: &str) -> Self {
            self.absent.insert(model.to_string());
            self
        }

        fn with_delay(mut self, model: &str, delay: Duration) -> Self {
            self.delays.insert(model.to_string(), delay);
            self
        }

        fn calls_for(&self, model: &str) -> u32 {
            *self.calls.lock().unwrap().get(model).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl ModelRuntime for ScriptedRuntime {
        async fn generate(&self, request: GenerationRequest) -> Result<String, RuntimeError> {
            if let Some(delay) = self.delays.get(&request.model_id) {
                tokio::time::sleep(*delay).await;
            }
            *self
                .calls
                .lock()
                .unwrap()
                .entry(request.model_id.clone())
                .or_insert(0) += 1;
            self.responses
                .lock()
                .unwrap()
                .get_mut(&request.model_id)
                .and_then(VecDeque::pop_front)
                .ok_or_else(|| RuntimeError::Failed(format!("script exhausted: {}", request.model_id)))
        }

        async fn ensure_present(
            &self,
            model_id: &str,
            _timeout: Duration,
        ) -> Result<(), RuntimeError> {
            if self.absent.contains(model_id) {
                Err(RuntimeError::ModelAbsent(model_id.to_string()))
            } else {
                Ok(())
            }
        }

        async fn load(&self, model_id: &str, _timeout: Duration) -> Result<(), RuntimeError> {
            self.load_attempts.fetch_add(1, Ordering::SeqCst);
            if self.absent.contains(model_id) {
                Err(RuntimeError::ModelAbsent(model_id.to_string()))
            } else {
                Ok(())
            }
        }

        async fn unload(&self, _model_id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    struct StubWeb;

    #[async_trait]
    impl WebSearch for StubWeb {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchHit>, SearchError> {
            Ok(vec![SearchHit {
                url: format!("https://example.com/{}", query.len()),
                title: format!("About: {query}"),
                snippet: "snippet".to_string(),
                content: format!("reference content about {query}"),
            }])
        }
    }

    struct StubVector;

    #[async_trait]
    impl VectorStore for StubVector {
        async fn add_documents(
            &self,
            _ids: Vec<String>,
            _texts: Vec<String>,
            _metadatas: Vec<serde_json::Value>,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn search(&self, query: &str, _k: usize) -> Result<Vec<VectorHit>, StoreError> {
            Ok(vec![VectorHit {
                id: "kb-doc-1".to_string(),
                content: format!("stored knowledge about {query}"),
                metadata: serde_json::json!({"title": "kb-doc-1"}),
                distance: 0.25,
            }])
        }
    }

    // Canned valid responses per agent

    fn interpreter_json() -> String {
        serde_json::json!({
            "primary_goal": "Explain blockchain consensus mechanisms",
            "domain": "distributed systems",
            "output_type": "research_report",
            "scope": "moderate",
            "extracted_requirements": ["cover PoW and PoS"],
            "ambiguities": [],
            "clarifying_questions": [],
            "confidence": 0.9
        })
        .to_string()
    }

    fn planner_json() -> String {
        serde_json::json!({
            "research_questions": [
                {"id": "RQ1", "question": "What is proof of work?", "type": "factual",
                 "priority": "critical", "estimated_time_minutes": 15, "dependencies": []},
                {"id": "RQ2", "question": "How does proof of stake differ?", "type": "comparative",
                 "priority": "high", "estimated_time_minutes": 15, "dependencies": ["RQ1"]}
            ],
            "phases": [{"name": "Survey", "description": "Cover both mechanisms",
                        "rq_ids": ["RQ1", "RQ2"], "parallel": false}],
            "success_criteria": ["Both mechanisms explained"],
            "estimated_total_time_minutes": 30
        })
        .to_string()
    }

    fn finding_json(question_id: &str) -> String {
        serde_json::json!({
            "question_id": question_id,
            "answer": "A grounded answer with cited evidence.",
            "key_findings": [
                {"finding": "Key claim", "evidence": [
                    {"source_id": "Source 1", "excerpt": "…", "reliability": "high"}
                ], "confidence": 0.85}
            ],
            "contradictions": [],
            "knowledge_gaps": [],
            "overall_confidence": 0.85
        })
        .to_string()
    }

    fn audit_json() -> String {
        serde_json::json!({
            "risk_assessment": {"overall_risk_level": "low", "risks": []},
            "dependencies": {"technical": [], "knowledge": []},
            "security_concerns": [],
            "feasibility_assessment": {"technical": 0.9, "resource": 0.9, "time": 0.9,
                                        "overall": 0.9, "blockers": []},
            "recommendations": ["Proceed"]
        })
        .to_string()
    }

    fn judge_json(groundedness: f64, coherence: f64, completeness: f64) -> String {
        serde_json::json!({
            "final_artifact": {
                "type": "research_report",
                "sections": [
                    {"title": "Overview", "content": "…", "confidence": 0.9, "evidence": []},
                    {"title": "Proof of Work", "content": "…", "confidence": 0.9, "evidence": []},
                    {"title": "Proof of Stake", "content": "…", "confidence": 0.9, "evidence": []},
                    {"title": "Comparison", "content": "…", "confidence": 0.85, "evidence": []}
                ],
                "metadata": {"total_sources": 4}
            },
            "consensus_score": {
                "groundedness": groundedness,
                "coherence": coherence,
                "completeness": completeness,
                "justification": "well grounded"
            },
            "revision_notes": "deepen the comparison section"
        })
        .to_string()
    }

    fn fast_config() -> EngineConfig {
        EngineConfig {
            model_load_backoff_base: Duration::from_millis(1),
            model_swap_settle: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn build_engine(runtime: Arc<ScriptedRuntime>) -> PipelineEngine {
        let config = fast_config();
        let slot = Arc::new(ModelSlot::new(runtime, &config));
        let retriever =
            EvidenceRetriever::new(Arc::new(StubWeb), Arc::new(StubVector), &config);

        let mut engine = PipelineEngine::new(slot, config).unwrap();
        engine.register(Arc::new(Interpreter::new(ModelDescriptor::new(
            INTERPRETER_MODEL,
            1000,
        ))));
        engine.register(Arc::new(Planner::new(ModelDescriptor::new(
            PLANNER_MODEL,
            1000,
        ))));
        engine.register(Arc::new(Grounder::new(
            ModelDescriptor::new(GROUNDER_MODEL, 1000),
            retriever,
        )));
        engine.register(Arc::new(Auditor::new(ModelDescriptor::new(
            AUDITOR_MODEL,
            1000,
        ))));
        engine.register(Arc::new(Judge::new(
            ModelDescriptor::new(JUDGE_MODEL, 1000),
            0.85,
            7,
        )));
        engine
    }

    fn research_request() -> RunRequest {
        RunRequest::new(
            Brief::new("Explain blockchain consensus mechanisms").unwrap(),
            Mode::Research,
            "test-session",
        )
    }

    fn happy_runtime() -> ScriptedRuntime {
        ScriptedRuntime::new()
            .script(INTERPRETER_MODEL, vec![interpreter_json()])
            .script(PLANNER_MODEL, vec![planner_json()])
            .script(
                GROUNDER_MODEL,
                vec![finding_json("RQ1"), finding_json("RQ2")],
            )
            .script(AUDITOR_MODEL, vec![audit_json()])
            .script(JUDGE_MODEL, vec![judge_json(0.9, 0.9, 0.84)])
    }

    #[tokio::test]
    async fn test_happy_research_run() {
        let runtime = Arc::new(happy_runtime());
        let engine = build_engine(Arc::clone(&runtime));

        let state = engine.run(research_request()).await.unwrap();

        assert_eq!(state.deliberation_round, 1);
        assert!((state.consensus_score.unwrap() - 0.88).abs() < 1e-6);
        assert!(state.final_artifact.as_ref().unwrap().sections.len() >= 4);
        assert!(state.errors.is_empty(), "errors: {:?}", state.errors);
        for agent in Mode::Research.agent_sequence() {
            assert!(state.agent_outputs.contains_key(agent), "missing {agent}");
        }
        assert!(artifact_accepted(&state));
        assert!(state.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_model_absent_planner_degrades_and_pipeline_continues() {
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .with_absent(PLANNER_MODEL)
                .script(INTERPRETER_MODEL, vec![interpreter_json()])
                // degraded plan has a single question equal to the brief
                .script(GROUNDER_MODEL, vec![finding_json("RQ1")])
                .script(AUDITOR_MODEL, vec![audit_json()])
                .script(JUDGE_MODEL, vec![judge_json(0.9, 0.9, 0.9)]),
        );
        let engine = build_engine(Arc::clone(&runtime));

        let state = engine.run(research_request()).await.unwrap();

        assert!(state.has_error_for(AgentId::Planner));
        let plan = state.plan.as_ref().unwrap();
        assert_eq!(plan.research_questions.len(), 1);
        assert_eq!(
            plan.research_questions[0].question,
            "Explain blockchain consensus mechanisms"
        );
        // Grounder still ran and the pipeline reached the Judge.
        assert!(state.agent_outputs.contains_key(&AgentId::Grounder));
        assert!(state.agent_outputs.contains_key(&AgentId::Judge));
        assert_eq!(runtime.calls_for(PLANNER_MODEL), 0);
    }

    #[tokio::test]
    async fn test_revision_round_reruns_grounder_onward() {
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .script(INTERPRETER_MODEL, vec![interpreter_json()])
                .script(PLANNER_MODEL, vec![planner_json()])
                .script(
                    GROUNDER_MODEL,
                    vec![
                        finding_json("RQ1"),
                        finding_json("RQ2"),
                        finding_json("RQ1"),
                        finding_json("RQ2"),
                    ],
                )
                .script(AUDITOR_MODEL, vec![audit_json(), audit_json()])
                .script(
                    JUDGE_MODEL,
                    vec![judge_json(0.7, 0.7, 0.7), judge_json(0.9, 0.9, 0.9)],
                ),
        );
        let engine = build_engine(Arc::clone(&runtime));

        let state = engine.run(research_request()).await.unwrap();

        assert_eq!(state.deliberation_round, 2);
        assert!((state.consensus_score.unwrap() - 0.9).abs() < 1e-6);
        assert!(state.errors.is_empty(), "errors: {:?}", state.errors);
        // Exactly one extra execution of Grounder -> Auditor -> Judge.
        assert_eq!(runtime.calls_for(INTERPRETER_MODEL), 1);
        assert_eq!(runtime.calls_for(PLANNER_MODEL), 1);
        assert_eq!(runtime.calls_for(GROUNDER_MODEL), 4);
        assert_eq!(runtime.calls_for(AUDITOR_MODEL), 2);
        assert_eq!(runtime.calls_for(JUDGE_MODEL), 2);
    }

    #[tokio::test]
    async fn test_cancellation_mid_grounder_returns_partial_state() {
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .with_delay(GROUNDER_MODEL, Duration::from_millis(200))
                .script(INTERPRETER_MODEL, vec![interpreter_json()])
                .script(PLANNER_MODEL, vec![planner_json()])
                .script(
                    GROUNDER_MODEL,
                    vec![finding_json("RQ1"), finding_json("RQ2")],
                )
                .script(AUDITOR_MODEL, vec![audit_json()])
                .script(JUDGE_MODEL, vec![judge_json(0.9, 0.9, 0.9)]),
        );
        let engine = build_engine(Arc::clone(&runtime));
        let cancel = engine.cancellation_token();

        // Fire the cancellation inside the second question's generation.
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let state = engine.run(research_request()).await.unwrap();

        assert_eq!(state.research_findings.len(), 1);
        assert!(state.has_error_for(AgentId::Grounder));
        assert!(state.audit_report.is_none());
        assert!(state.final_artifact.is_none());
        assert!(!state.agent_outputs.contains_key(&AgentId::Auditor));
        assert!(!state.agent_outputs.contains_key(&AgentId::Judge));
    }

    #[tokio::test]
    async fn test_bad_json_then_recovery_retries_once() {
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .script(
                    INTERPRETER_MODEL,
                    vec!["I will think about this first.".to_string(), interpreter_json()],
                )
                .script(PLANNER_MODEL, vec![planner_json()])
                .script(
                    GROUNDER_MODEL,
                    vec![finding_json("RQ1"), finding_json("RQ2")],
                )
                .script(AUDITOR_MODEL, vec![audit_json()])
                .script(JUDGE_MODEL, vec![judge_json(0.9, 0.9, 0.84)]),
        );
        let engine = build_engine(Arc::clone(&runtime));

        let state = engine.run(research_request()).await.unwrap();

        assert_eq!(runtime.calls_for(INTERPRETER_MODEL), 2);
        assert!(state.intent.is_some());
        assert!(state.errors.is_empty(), "errors: {:?}", state.errors);
    }

    #[tokio::test]
    async fn test_degraded_judge_fails_final_gate() {
        // Judge returns garbage on every attempt: it degrades to an empty
        // artifact, the final gate rejects, and the run still completes.
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .script(INTERPRETER_MODEL, vec![interpreter_json()])
                .script(PLANNER_MODEL, vec![planner_json()])
                .script(
                    GROUNDER_MODEL,
                    vec![finding_json("RQ1"), finding_json("RQ2")],
                )
                .script(AUDITOR_MODEL, vec![audit_json()])
                .script(
                    JUDGE_MODEL,
                    vec!["not json".into(), "still not json".into(), "nope".into()],
                ),
        );
        let engine = build_engine(Arc::clone(&runtime));

        let state = engine.run(research_request()).await.unwrap();

        assert!(state.has_error_for(AgentId::Judge));
        assert!(!artifact_accepted(&state));
        assert!(state.final_artifact.is_some());
    }

    #[tokio::test]
    async fn test_unregistered_agent_is_fatal() {
        let runtime = Arc::new(ScriptedRuntime::new());
        let config = fast_config();
        let slot = Arc::new(ModelSlot::new(runtime, &config));
        let engine = PipelineEngine::new(slot, config).unwrap();

        let result = engine.run(research_request()).await;
        assert!(matches!(result, Err(EngineError::AgentNotRegistered(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_refused() {
        let runtime = Arc::new(ScriptedRuntime::new());
        let config = EngineConfig {
            consensus_threshold: 2.0,
            ..fast_config()
        };
        let slot = Arc::new(ModelSlot::new(runtime, &config));
        assert!(PipelineEngine::new(slot, config).is_err());
    }

    #[tokio::test]
    async fn test_outputs_follow_mode_order() {
        let runtime = Arc::new(happy_runtime());
        let engine = build_engine(runtime);

        let state = engine.run(research_request()).await.unwrap();

        let sequence = Mode::Research.agent_sequence();
        let mut positions = Vec::new();
        for (agent, _) in &state.agent_outputs {
            positions.push(sequence.iter().position(|id| id == agent).unwrap());
        }
        // Every producer appears in the declared sequence; with a clean run
        // all five are present.
        assert_eq!(positions.len(), sequence.len());
    }

    #[tokio::test]
    async fn test_every_agent_has_output_or_error() {
        // Interpreter model is absent: it degrades but something must be
        // recorded for every agent in the sequence.
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .with_absent(INTERPRETER_MODEL)
                .script(PLANNER_MODEL, vec![planner_json()])
                .script(
                    GROUNDER_MODEL,
                    vec![finding_json("RQ1"), finding_json("RQ2")],
                )
                .script(AUDITOR_MODEL, vec![audit_json()])
                .script(JUDGE_MODEL, vec![judge_json(0.9, 0.9, 0.9)]),
        );
        let engine = build_engine(runtime);

        let state = engine.run(research_request()).await.unwrap();

        for agent in Mode::Research.agent_sequence() {
            assert!(
                state.agent_outputs.contains_key(agent) || state.has_error_for(*agent),
                "nothing recorded for {agent}"
            );
        }
    }

    #[tokio::test]
    async fn test_evidence_keys_within_plan() {
        let runtime = Arc::new(happy_runtime());
        let engine = build_engine(runtime);

        let state = engine.run(research_request()).await.unwrap();
        assert!(state.evidence_within_plan());
        assert_eq!(state.evidence.len(), 2);
    }

    #[tokio::test]
    async fn test_deterministic_artifact_across_runs() {
        let state_a = build_engine(Arc::new(happy_runtime()))
            .run(research_request())
            .await
            .unwrap();
        let state_b = build_engine(Arc::new(happy_runtime()))
            .run(research_request())
            .await
            .unwrap();

        let artifact_a = serde_json::to_string(&state_a.final_artifact).unwrap();
        let artifact_b = serde_json::to_string(&state_b.final_artifact).unwrap();
        assert_eq!(artifact_a, artifact_b);
    }

    #[tokio::test]
    async fn test_learn_mode_skips_auditor() {
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .script(INTERPRETER_MODEL, vec![interpreter_json()])
                .script(PLANNER_MODEL, vec![planner_json()])
                .script(
                    GROUNDER_MODEL,
                    vec![finding_json("RQ1"), finding_json("RQ2")],
                )
                .script(JUDGE_MODEL, vec![judge_json(0.9, 0.9, 0.9)]),
        );
        let engine = build_engine(Arc::clone(&runtime));

        let request = RunRequest::new(
            Brief::new("Teach me consensus").unwrap(),
            Mode::Learn,
            "learn-session",
        );
        let state = engine.run(request).await.unwrap();

        assert_eq!(runtime.calls_for(AUDITOR_MODEL), 0);
        assert!(state.audit_report.is_none());
        assert!(state.agent_outputs.contains_key(&AgentId::Judge));
    }
}
