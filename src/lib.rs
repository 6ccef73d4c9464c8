//! Chronicle - activity feed reconstruction for application clusters
//!
//! Rebuilds a human-readable activity feed for one organization's set of
//! on-chain application contracts purely from ledger data: logs, raw
//! transaction bodies, block timestamps, and a description-resolution
//! service.

pub mod describe;
pub mod directory;
pub mod error;
pub mod feed;
pub mod forward;
pub mod rpc;
pub mod types;

// Re-export the main types for convenience
pub use describe::{Annotation, CallScriptDescriber, Describer, Description, ScriptStep};
pub use directory::{Directory, FileDirectory};
pub use error::FeedError;
pub use feed::{Activity, ActivityFeed, SyncTrigger};
pub use rpc::{Ledger, LedgerClient};
