//! The state-machine driver: validates transitions, commits status,
//! triggers cascades, recomputes aggregate progress, and emits change
//! events.

mod converge;
mod core;
mod events;
mod progress;
mod transitions;

#[cfg(test)]
mod tests;

pub use converge::Convergence;
pub use core::StageOrchestrator;
pub use events::{EventBus, StageEvent};
pub use transitions::{AppliedChange, ChangeOptions, ChangeOutcome};
