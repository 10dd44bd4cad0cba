//! Shared types and error hierarchy for Confab.

pub mod completer;
pub mod error;
pub mod turn;
pub mod util;

pub use completer::{Completer, CompletionFuture};
pub use error::{ConfigError, ModelError};
pub use turn::{Role, Turn, UserId};
pub use util::{preview_line, truncate_str};
