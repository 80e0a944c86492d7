//! Core data types for the Porter migration orchestrator.
//!
//! This crate provides the foundation data types shared by every Porter crate:
//! repository references, migration requests, the job record and its
//! lifecycle states, quota snapshots, build file detection, and the
//! change-set produced by a transformation engine. It also provides the two
//! time seams used across the workspace, [`Clock`] and [`CancelToken`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod build_file;
mod cancel;
mod clock;
mod directive;
mod job;
mod quota;
mod repository;
mod request;
mod transform;

pub use build_file::{BUILD_FILES, BuildTool};
pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use directive::{Directive, upgrade_directives, validate_directives};
pub use job::{CompletionReport, FailureReport, Job, JobId, JobResult, JobState, ProgressEntry};
pub use quota::{Endpoint, Observed, QuotaObservation, QuotaState};
pub use repository::{Platform, RepositoryRef};
pub use request::{CredentialRef, MigrationRequest, MigrationRequestBuilder};
pub use transform::{ChangeKind, ChangeSet, FileChange, TransformOutput, TransformReport};
