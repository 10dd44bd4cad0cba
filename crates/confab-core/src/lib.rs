//! Reply-cycle orchestration for Confab.
//!
//! [`ResponseSession`] runs one reply cycle: build a context window
//! from the history store, invoke the completion collaborator under a
//! timeout, suppress verbatim repeats against a bounded recent-reply
//! window with at most one regeneration attempt, and record the final
//! assistant turn.

pub mod responder;
pub mod window;

pub use responder::{ReplyConfig, ResponseSession};
pub use window::ReplyWindow;
