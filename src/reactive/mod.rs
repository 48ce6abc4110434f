//! Reactive recomputation: an explicit dependency graph plus an optional
//! background worker.
//!
//! ```text
//!   set(source) ──► dependents marked stale, generation += 1
//!        │
//!        ▼
//!   plan()  ──► stale nodes → computing (memo hits resolved on the spot)
//!        │
//!        ▼
//!   Plan::run()  (inline, or on the worker thread)
//!        │
//!        ▼
//!   apply(outcome) ──► fresh, unless a newer generation superseded it
//! ```

pub mod graph;
pub mod worker;

pub use graph::{Graph, NodeId, NodeState, Outcome, Plan, fingerprint};
pub use worker::Worker;
