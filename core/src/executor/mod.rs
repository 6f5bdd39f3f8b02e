//! Supervised execution of a role graph
//!
//! ```text
//! RoleRegistry
//!   ↓
//! TaskGraph::from_tasks() → validate() → execution_plan()
//!   ↓
//! Scheduler::run()
//!   ├─ stage 0: independent roles, one spawned RevisionController each (barrier)
//!   ├─ dependents, one at a time, context = declared dependencies
//!   └─ synthesis, context = every other role
//!   ↓
//! AnalysisReport { final_report, details, revision_history, trace }
//! ```

mod cancel;
mod context;
mod controller;
mod engine;
mod graph;
mod progress;
mod retry;
mod scheduler;
pub mod trace;
pub mod traits;
pub mod types;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use context::ContextAssembler;
pub use controller::{ControllerDeps, RevisionController};
pub use engine::{AnalysisEngine, AnalysisEngineBuilder};
pub use graph::TaskGraph;
pub use progress::ProgressMonitor;
pub use retry::ExponentialBackoffPlugin;
pub use scheduler::{execute_stage_parallel, execution_plan, Scheduler};
pub use trace::{RevisionHistory, TraceLog, TraceRecord};
pub use types::{ExecutionOpts, RevisionPolicy, RoleOutcome, Task, TaskStatus};
