//! Conversation tool loop.
//!
//! Drives a bounded exchange with a text-only model:
//!
//! ```text
//! for turn in 1..=max_turns:
//!     text = clean(llm.respond(turn_log, prompt))
//!     call = try_parse_tool_call(text)     // none: text is the answer
//!     if dedup.seen(call): prompt = "don't repeat"; continue
//!     result = tools.execute(call)
//!     prompt = continuation(result)
//! ```
//!
//! # Key Components
//!
//! - [`ConversationToolLoop`]: the loop itself
//! - [`LoopOutcome`]: answer, status and turn log
//! - [`LoopObserver`]: progress side channel

pub mod controller;
pub mod types;

pub use controller::ConversationToolLoop;
pub use types::{LoopObserver, LoopOutcome, LoopStatus, NoopObserver};
