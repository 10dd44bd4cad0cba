//! Capped per-user conversation history for Confab.
//!
//! The [`HistoryStore`] owns the ordered turn record for every user
//! session, enforces the retention cap on each mutation, and mirrors
//! turns into an optional durable [`TurnStore`]. Durable faults are
//! absorbed: the conversation keeps running on the in-memory view.

pub mod error;
pub mod history;
pub mod registry;
pub mod session;
pub mod store;

pub use error::StoreError;
pub use history::{HistoryConfig, HistoryStore};
pub use registry::{SessionEntry, SessionRegistry};
pub use session::{Session, SessionSnapshot};
pub use store::{FileTurnStore, StoreFuture, TurnStore};
