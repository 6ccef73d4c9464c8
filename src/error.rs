//! Pipeline error taxonomy
//!
//! Classifies failures by the stage they occur in. Directory and log
//! failures are fatal to a run; transaction-level failures are isolated
//! by the pipeline and only surface here when classification is needed
//! for logging.

use alloy_primitives::B256;
use thiserror::Error;

/// Errors surfaced by an activity feed run.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The organization directory could not be reached. No address set
    /// means no run.
    #[error("application directory unavailable")]
    DirectoryUnavailable(#[source] anyhow::Error),

    /// A ledger read failed. For the batched log query this is fatal to
    /// the run; for a per-transaction block fetch the pipeline isolates
    /// it and skips that transaction.
    #[error("ledger query failed")]
    LedgerQueryFailed(#[source] anyhow::Error),

    /// The ledger returned no transaction for a hash taken from its own
    /// logs.
    #[error("transaction {0} not found on ledger")]
    TransactionNotFound(B256),

    /// The description service rejected a transaction's calldata.
    #[error("description resolution failed for transaction {tx}")]
    DescriptionResolutionFailed {
        tx: B256,
        #[source]
        source: anyhow::Error,
    },

    /// A forwarded transaction's embedded script could not be decoded,
    /// or decoded to zero steps.
    #[error("script decode failed for transaction {tx}: {reason}")]
    ScriptDecodeFailed { tx: B256, reason: String },

    /// A newer resync started before this run finished; its results
    /// were discarded.
    #[error("run superseded by a newer resync")]
    Superseded,
}
