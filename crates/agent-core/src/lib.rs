//! Agent execution engine.
//!
//! Turns free-text model output into tool calls, runs them against an
//! unreliable live page, and feeds the results back until the model answers.
//!
//! # Layers
//!
//! - [`ToolDispatcher`]: one async operation per registered tool
//! - [`ScrapePipeline`]: sequential per-target deep extraction
//! - [`ConversationToolLoop`]: the bounded model/tool turn loop
//! - [`InvocationGuardrail`]: per-request usage ceilings layered by the caller

pub mod agent_loop;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod errors;
pub mod external_search;
pub mod guardrails;
pub mod llm_provider;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod registry;
pub mod tool_call;

pub use agent_loop::{ConversationToolLoop, LoopObserver, LoopOutcome, LoopStatus, NoopObserver};
pub use config::{EngineConfig, GuardrailLimits};
pub use dedup::{DedupCache, DedupKey};
pub use dispatcher::{NoProgress, ToolDispatcher, ToolExecutor, ToolProgress};
pub use errors::AgentError;
pub use external_search::{QueryOutcome, SearchBackend, SearchHit};
pub use guardrails::{InvocationGuardrail, UsageCounters};
pub use llm_provider::{LlmTextInterface, ScriptedLlm};
pub use model::{ConversationTurn, ErrorKind, ToolCall, ToolData, ToolKind, ToolResult};
pub use pipeline::{BatchReport, ScrapeJob, ScrapePipeline, TargetReport};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use tool_call::{clean_response, try_parse_tool_call};
