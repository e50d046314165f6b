//! Simulcast error types
//!
//! Every failure here is a caller error surfaced immediately. Nothing in this
//! layer is transient, so there is no retry classification.

use thiserror::Error;

/// Error type for simulcast track operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulcastError {
    /// A remapped encoding id is already registered on the aggregate
    #[error("Duplicate encoding id: {id}")]
    DuplicateEncoding {
        /// The colliding remapped id
        id: String,
    },

    /// The member track is already part of the aggregate
    #[error("Track already added: {track_id}")]
    DuplicateTrack {
        /// Member track id
        track_id: String,
    },

    /// The aggregate was stopped and cannot take new members
    #[error("Simulcast track stopped: {track_id}")]
    Stopped {
        /// Aggregate track id
        track_id: String,
    },

    /// `detached()` was called more often than `attached()`
    #[error("Detach without matching attach on {track_id}")]
    AttachUnderflow {
        /// Aggregate track id
        track_id: String,
    },
}

/// Result alias for simulcast operations
pub type Result<T> = std::result::Result<T, SimulcastError>;
