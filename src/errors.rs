//! Capability Engine Error Hierarchy
//!
//! Defines error types for the capability cache, the negotiation engine
//! and the tag dispatch core, categorized by subsystem.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Capability cache resolution failures
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Tag dispatch registry violations
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Peer feature-query collaborator failures
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Durable store I/O and serialization failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No entry in any store tier and no pending lookup left to wait on.
    ///
    /// Recovered locally by callers: fall through to the next resolution
    /// strategy or report "no capability information available" upward.
    #[error("no cached capability info for key {0}")]
    NotFound(String),

    /// Recomputed hash of the returned feature description does not match
    /// the claimed capability key. Fans out to every concurrent waiter of
    /// the pending lookup; does not poison the cache.
    #[error("capability hash mismatch for node {node}")]
    VerificationFailed { node: String },

    /// Resolution was requested with an empty candidate key list.
    #[error("no candidate capability keys to resolve")]
    NoCandidateKeys,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Second registration attempt for an occupied tag. The existing
    /// registration is left untouched.
    #[error("only one listener is allowed per tag: {0}")]
    DuplicateTag(String),

    /// Delivery or removal addressed a tag with no live registration.
    /// Raised both for never-registered and for already-removed tags.
    #[error("no listener registered for tag: {0}")]
    UnknownTag(String),
}

/// Failures of the feature-query collaborator. `Clone` so collaborator
/// stubs can replay a canned failure per call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    /// Peer did not answer the feature query within the collaborator's
    /// deadline; propagated unchanged by the resolution flow
    #[error("feature query to {peer} timed out after {duration:?}")]
    Timeout { peer: String, duration: Duration },

    /// Transport-level failure, propagated from the collaborator without retry
    #[error("feature query transport error: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during store reads or writeback
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Writeback could not be atomically moved into place
    #[error("failed to persist cache entry at {path}")]
    PersistFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for captured entry bytes
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),
}
