//! # Authentication Protocol
//!
//! Wire messages, framing codec, SRP6 key exchange, and the session state
//! machine that ties them together over a [`PacketSink`].
//!
//! [`PacketSink`]: crate::transport::PacketSink

pub mod codec;
pub mod message;
pub mod session;
pub mod srp6;

pub use message::{
    AuthResult, ChallengeBody, ChallengeResponse, Opcode, ProofBody, ProofResponse, Realm,
    RealmFlags, RealmListResponse, SecurityFlags,
};
pub use session::{AuthSession, SessionOutcome};
pub use srp6::Srp6Verifier;

#[cfg(test)]
mod tests;
