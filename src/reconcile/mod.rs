//! Reconciliation
//!
//! Periodic sweep that settles stale PENDING payments against the gateway
//! ledger, plus the in-memory snapshot fallback for downstream read pages.

pub mod snapshot;
pub mod worker;

pub use snapshot::SnapshotCache;
pub use worker::ReconcileWorker;
