//! Dependency-linked stage coordination for structured production
//! workflows: derived-status resolution, cascade impact evaluation,
//! topological date scheduling, and a polling reconciliation watcher.

pub mod cascade;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod orchestrator;
pub mod schedule;
pub mod store;
pub mod watcher;
