/// Progress weight of a `critical` blocking priority stage.
pub const WEIGHT_CRITICAL: u32 = 4;

/// Progress weight of a `high` blocking priority stage.
pub const WEIGHT_HIGH: u32 = 3;

/// Progress weight of a `medium` blocking priority stage.
pub const WEIGHT_MEDIUM: u32 = 2;

/// Progress weight of a `low` blocking priority stage.
pub const WEIGHT_LOW: u32 = 1;

/// Weight multiplier for stages in the configured master-unlock set.
/// These stages gate many others, so their completion moves the
/// aggregate further.
pub const MASTER_UNLOCK_MULTIPLIER: u32 = 2;

/// Default interval between watcher reconciliation passes, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Scheduling defaults, in days.
pub mod schedule {
    /// Fallback duration for internal (non-deliverable) stages.
    pub const DEFAULT_INTERNAL_DURATION: u32 = 2;

    /// Fallback duration for deliverable stages; client approval rounds
    /// make these longer than internal tasks.
    pub const DEFAULT_DELIVERABLE_DURATION: u32 = 5;

    /// Fallback duration for strategy/brand deliverables, the longest
    /// kind of work in the standard template.
    pub const DEFAULT_STRATEGY_DURATION: u32 = 7;

    /// Buffer between a dependency's end and a dependent's start.
    pub const BUFFER_DEFAULT: u32 = 1;

    /// Buffer for deliverable dependents (approval time).
    pub const BUFFER_DELIVERABLE: u32 = 2;

    /// Buffer when the phase category changes from the previous stage
    /// in schedule order.
    pub const BUFFER_CATEGORY_CHANGE: u32 = 3;

    /// Buffer for externally-facing stages.
    pub const BUFFER_EXTERNAL: u32 = 2;

    /// Buffer for `critical` priority stages.
    pub const BUFFER_CRITICAL: u32 = 1;

    /// Per-index stagger applied to very early onboarding stages so they
    /// do not all land on the project start date.
    pub const ONBOARDING_STAGGER: u32 = 1;

    /// `number_index` below which the onboarding stagger applies.
    pub const ONBOARDING_STAGGER_CUTOFF: u32 = 5;
}
