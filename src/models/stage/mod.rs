mod methods;
mod transitions;
mod types;


pub use types::{BlockingPriority, Stage, StageStatus};
