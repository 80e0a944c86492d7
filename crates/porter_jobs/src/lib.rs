//! Job persistence for Porter.
//!
//! The [`JobStore`] trait is the authoritative record of every migration
//! job. The orchestrator reads and writes jobs only through it, and every
//! state change appends its progress entry in the same step, so concurrent
//! status polling always observes a consistent snapshot.
//!
//! [`InMemoryJobStore`] is the bundled implementation; a durable store is a
//! matter of implementing the trait.

#![warn(missing_docs)]

mod filter;
mod memory;
mod store;

pub use filter::JobFilter;
pub use memory::InMemoryJobStore;
pub use store::JobStore;
