//! # Declarative
//!
//! A framework for declarative management of remote resources.
//!
//! Configuration declares the desired resources; recorded state remembers
//! what was created and under which remote id. Planning refreshes the
//! recorded state, diffs it against the declarations and decides what to
//! create, update, replace or delete. Execution applies the plan and
//! returns the new state.
//!
//! ## Core Concepts
//!
//! - **ResourceType**: lifecycle operations (create/read/update/delete/import)
//!   for one kind of remote object
//! - **Provider**: registry of resource types by name
//! - **ResourceData**: recorded id and attributes of one managed resource
//! - **Plan**: refreshed state plus one [`Change`] per address
//! - **Executor**: applies a plan with bounded parallelism
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Declared, ExecuteOptions, Provider, State, execute_simple, plan};
//!
//! let provider = Provider::new().with(NoteType::new(api));
//! let declared = vec![Declared::new("note", "todo", config)];
//!
//! let plan = plan(&provider, &declared, &state, 4)?;
//! for change in plan.pending() {
//!     println!("{} {}", change.change.symbol(), change.address);
//! }
//!
//! let outcome = execute_simple(&provider, &plan, &ExecuteOptions::default())?;
//! save(&outcome.state)?;
//! ```
//!
//! ## Callbacks
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{AttributeDiff, diff_attributes, diff_attributes_with, display_value};
pub use executor::{ExecuteOutcome, execute, execute_simple};
pub use planner::{Change, Plan, PlannedChange, State, plan};
pub use resource::{Provider, ResourceType};
pub use types::{
    ApplyResult, Attributes, Declared, ExecuteOptions, ExecuteSummary, ResourceData,
};
