//! Trait definitions for the collaborators a migration job drives.
//!
//! This crate provides the interfaces the orchestrator consumes: the
//! source-control platform API, the git client, the transformation engine,
//! the notifier and the credential store.

#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{CredentialStore, Notifier, RepositoryCloner, TransformationEngine, VcsPlatform};
pub use types::{
    AccessToken, BranchRef, ChangeRequest, ChangeRequestDraft, ChangeRequestDraftBuilder,
    CommitRef, Notice, RepositoryMetadata,
};
