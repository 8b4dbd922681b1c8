//! # Error Types
//!
//! Comprehensive error handling for the authentication client.
//!
//! This module defines all error variants that can occur during an
//! authentication session, from low-level I/O errors to protocol violations
//! and SRP6 safeguard aborts.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket failures, peer shutdown mid-session
//! - **Protocol Errors**: Malformed frames, unexpected opcodes
//! - **Authentication Failures**: Non-success result codes from the server
//! - **Safeguard Aborts**: SRP6 invariant violations (malicious/buggy peer)
//! - **Mutual-Authentication Failure**: Server could not prove the shared secret
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

use crate::protocol::message::AuthResult;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Framing/codec errors
    pub const ERR_TRUNCATED_FRAME: &str = "frame shorter than its declared length";
    pub const ERR_REALM_RECORD: &str = "malformed realm record";
    pub const ERR_UNTERMINATED_STRING: &str = "unterminated string field";

    /// Session errors
    pub const ERR_SESSION_NOT_STARTED: &str = "session processed data before start";
    pub const ERR_SESSION_TERMINAL: &str = "session already reached a terminal state";
}

/// Violation of one of the SRP6 safeguard invariants.
///
/// Any of these indicates a malicious or malfunctioning server. The key
/// exchange is aborted and no key material is produced.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeguardViolation {
    #[error("server public ephemeral is zero modulo N")]
    PublicEphemeralZero,

    #[error("client private ephemeral must be less than N")]
    PrivateEphemeralTooLarge,

    #[error("scrambling value u must not be zero")]
    ScramblingValueZero,

    #[error("shared secret S must be greater than zero")]
    SharedSecretNotPositive,
}

/// Primary error type for all authentication client operations.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("SRP6 safeguard: {0}")]
    Safeguard(#[from] SafeguardViolation),

    #[error("Authentication rejected by server: {}", .0.message())]
    ServerRejected(AuthResult),

    #[error("Mutual authentication failed: server M2 proof is invalid")]
    ServerProofInvalid,

    #[error("No realms available")]
    NoRealms,

    #[error("Session error: {0}")]
    Session(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout occurred")]
    Timeout,
}

/// Type alias for Results using AuthError
pub type Result<T> = std::result::Result<T, AuthError>;
