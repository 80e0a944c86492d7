//! Error types for the Porter migration orchestrator.
//!
//! This crate provides the foundation error types used throughout the Porter workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Three layers matter to callers:
//! - [`ApiError`] is what a single external platform call produces.
//! - [`MigrationError`] carries a [`FailureKind`] from the job failure taxonomy
//!   and is what the rate-limited client and the orchestrator stages return.
//! - [`JobError`] is what the outbound job operations return (`InvalidRequest`,
//!   `NotFound`).
//!
//! # Examples
//!
//! ```
//! use porter_error::{ConfigError, PorterResult};
//!
//! fn load() -> PorterResult<String> {
//!     Err(ConfigError::new("missing [rate_limit] section"))?
//! }
//!
//! match load() {
//!     Ok(value) => println!("Got: {}", value),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod error;
mod job;
mod migration;

pub use api::{ApiError, ApiErrorKind, ReportedQuota, RetryableError};
pub use config::ConfigError;
pub use error::{PorterError, PorterErrorKind, PorterResult};
pub use job::{JobError, JobErrorKind};
pub use migration::{FailureKind, MigrationError};
