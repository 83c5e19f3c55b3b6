//! Controlled scheduler, exploration strategies, actor runtime, and
//! specification monitors for systematically testing concurrent Rust
//! code.
//!
//! [`driver::explore`] is the usual entry point: it drives a user-supplied
//! async entry point through [`Config::testing_iterations`](systematic_core::Config)
//! iterations, installing a fresh [`Engine`] as the ambient runtime for
//! each one.

pub mod actor;
pub mod ambient;
pub mod driver;
pub mod engine;
pub mod error;
pub mod gate;
pub mod monitor;
pub mod operation;
pub mod strategy;
pub mod sync;

pub use engine::Engine;
pub use error::{Cancelled, OpResult};

pub use systematic_core::{
    BugKind, Config, DataRaceKind, Event, IterationOutcome, IterationReport, OperationCounts,
    OperationId, RunReport, SchedulingPointType, SchedulingPolicy, StrategyKind,
};
