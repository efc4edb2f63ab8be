//! Application layer for colloquy
//!
//! This crate orchestrates the deliberation pipeline. It defines the ports
//! the core depends on (model runtime, web search, vector store, progress),
//! the single-slot model loader, the evidence retriever, the shared agent
//! think-cycle with its six agents, and the pipeline engine that sequences
//! them per execution mode.
//!
//! Implementations of the ports (adapters) live in the infrastructure layer.

pub mod agents;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod ports;
pub mod retrieval;
pub mod slot;

// Re-export commonly used types
pub use agents::{
    auditor::Auditor, grounder::Grounder, interpreter::Interpreter, judge::Judge,
    planner::Planner, visualizer::Visualizer, Agent, AgentContext, ParseReject,
};
pub use config::{ConfigError, EngineConfig};
pub use deadline::Deadline;
pub use engine::{EngineError, PipelineEngine, RunRequest};
pub use ports::{
    model_runtime::{GenerationRequest, ModelRuntime, RuntimeError},
    progress::{NoProgress, PipelineProgress},
    vector_store::{StoreError, VectorHit, VectorStore},
    web_search::{SearchError, SearchHit, WebSearch},
};
pub use retrieval::{EvidenceRetriever, RetrievalOutcome, RetrievalWarning};
pub use slot::{ModelSlot, SlotError};
