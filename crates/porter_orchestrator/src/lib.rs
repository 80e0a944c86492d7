//! Migration job state machine driver.
//!
//! [`MigrationOrchestrator`] accepts migration requests, records them in a
//! [`porter_jobs::JobStore`] and drives each job through
//!
//! ```text
//! Pending -> Analyzing -> Cloning -> Transforming -> Reporting -> Publishing -> Notifying -> Completed
//! ```
//!
//! on its own tokio task, with `Failed` reachable from every non-terminal
//! state. Every platform call goes through the shared
//! [`porter_rate_limit::RateLimitedClient`].

#![warn(missing_docs)]

mod orchestrator;
mod pipeline;
mod summary;
mod workspace;

pub use orchestrator::MigrationOrchestrator;
pub use summary::{MigrationReport, change_request_body, summarize};
pub use workspace::JobWorkspace;
