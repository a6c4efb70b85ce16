//! # insight-sync
//!
//! Resumable batch sync of business records into the vector store.
//!
//! There is no offset ledger. The checkpoint is the store itself: point
//! ids are a pure function of record content, so "does this id already
//! exist" is exactly "has this record already been synced". A run that
//! stops anywhere — crash, kill, or quota pause — leaves a durable prefix
//! behind, and the next run's existence probe skips it. This is the
//! correctness argument for resumability; the id determinism in
//! `insight-types` is what makes it hold.
//!
//! Quota exhaustion is handled as a clean pause
//! ([`SyncOutcome::PausedOnQuota`]), never as an error bubbling to the
//! caller.

pub mod error;
pub mod pipeline;

pub use error::SyncError;
pub use pipeline::{SyncOutcome, SyncPipeline, SyncStats};
