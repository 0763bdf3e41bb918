//! Multi-step dialogues.
//!
//! - `session`: per-user [`DialogSession`] state and the [`SessionRegistry`].
//! - `engine`: the [`ConversationEngine`] state machine.

pub mod engine;
pub mod session;

pub use engine::{ConversationEngine, EventOrigin};
pub use session::{DialogSession, DialogStage, EditKind, EditTarget, SessionRegistry, TaskDraft};
