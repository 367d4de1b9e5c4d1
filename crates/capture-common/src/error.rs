//! Error types for the capture simulation core.
//!
//! Only hard failures live here. Stale references and unknown species are
//! soft misses and are expressed as `Option` or fallback values instead.

use thiserror::Error;

use crate::ids::UserId;

/// Top-level error type for capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Packet envelope errors
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// Registry snapshot errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Path state machine errors
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Throw request errors
    #[error("Throw error: {0}")]
    Throw(#[from] ThrowError),
}

/// Packet decode failures. A decoder never coerces a malformed envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Payload is not valid JSON
    #[error("Malformed packet payload: {0}")]
    Malformed(String),

    /// Payload is valid JSON but not an object
    #[error("Packet must be an object")]
    NotAnObject,

    /// `type` field absent
    #[error("Packet is missing `type`")]
    MissingType,

    /// `type` present but not an integer
    #[error("Packet `type` must be an integer")]
    InvalidType,

    /// `id` present but neither string nor integer
    #[error("Packet `id` must be a string or an integer")]
    InvalidId,

    /// `nsp` present but not a string
    #[error("Packet `nsp` must be a string")]
    InvalidNamespace,
}

/// Registry snapshot failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot could not be parsed
    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    /// Snapshot written by an incompatible schema
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },
}

/// Path state machine failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The requested phase change is not an edge of the path state machine
    #[error("Invalid path transition from {from} to {to}")]
    InvalidTransition {
        /// Phase the path was in
        from: String,
        /// Phase that was requested
        to: String,
    },
}

/// Throw request failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThrowError {
    /// The user is not part of the room
    #[error("Unknown user {0}")]
    UnknownUser(UserId),

    /// The user holds no captured group to throw
    #[error("User {0} has nothing captured")]
    NothingCaptured(UserId),
}

/// Result type alias for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
