//! The conversational agent — one stateful session over one provider.
//!
//! A turn follows a fixed cycle:
//!
//! 1. **Receive** a user message (validated by the gateway)
//! 2. **Append** it to the shared message log
//! 3. **Generate** via the configured provider, streaming or complete
//! 4. **Append** the assistant message once the turn finishes cleanly
//!
//! The message log is the only shared mutable state. A turn gate serializes
//! turns against it, and `clear`/`load_history` take the same gate so the log
//! is never mutated under a mid-flight turn.

pub mod history;
pub mod runner;
pub mod stream_event;

pub use runner::{Agent, TurnOutput};
pub use stream_event::StreamEvent;
