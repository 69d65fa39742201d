//! MarketScout library
//!
//! Wires the agent engine to its outer collaborators: configuration, the
//! HTTP model and search clients, the session registry and the per-request
//! orchestrator. The `marketscout` binary is a thin shell over this crate.

pub mod config;
pub mod detached;
pub mod errors;
pub mod events;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod runtime;
pub mod serper;
pub mod sessions;

pub use config::{Config, LlmSettings, LogFormat, SearchSettings};
pub use detached::DetachedBrowser;
pub use errors::RequestError;
pub use events::{BusObserver, StatusBus, StatusEvent};
pub use orchestrator::{Orchestrator, Reply};
pub use runtime::{init_logging, load_config, LoadedConfig};
pub use serper::SerperBackend;
pub use sessions::{Role, SessionRegistry, SessionSnapshot, ToolProgressState};
