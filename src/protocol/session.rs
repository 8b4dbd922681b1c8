//! # Authentication Session
//!
//! The protocol state machine: the only component that knows which phase
//! the handshake is in. On every data-arrival event it asks the codec
//! whether a full message of the expected kind is buffered, decodes it,
//! drives the SRP6 engine, and emits the next request through the
//! transport's sink.
//!
//! Phases advance `Start → AwaitingChallenge → AwaitingProof →
//! AwaitingRealmList → {Done | Failed}`. The terminal states close the
//! transport and ignore all further input. A message whose opcode does not
//! match the expected phase is never decoded.

use rand::RngCore;
use tracing::{debug, info, warn};

use crate::config::{AccountConfig, ClientInfo};
use crate::core::buffer::ByteCursor;
use crate::error::{constants, AuthError, Result};
use crate::protocol::codec;
use crate::protocol::message::{
    ChallengeResponse, Opcode, ProofResponse, Realm, RealmListResponse,
};
use crate::protocol::srp6::{Srp6Verifier, PROOF_LENGTH};
use crate::transport::{PacketHandler, PacketSink};
use crate::utils::hex;

/// Session phase. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    AwaitingChallenge,
    AwaitingProof,
    AwaitingRealmList,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// Terminal outcome of one authentication attempt.
#[derive(Debug)]
pub enum SessionOutcome {
    /// Authentication succeeded and the server listed these realms.
    Realms(Vec<Realm>),
    /// Authentication succeeded but the server has no realms. Terminal,
    /// not an error.
    NoRealms,
    /// The session failed; the error says why.
    Failed(AuthError),
}

/// Client-side authentication session over one connection.
pub struct AuthSession<S, R> {
    account: AccountConfig,
    client_info: ClientInfo,
    token: Option<String>,
    sink: S,
    rng: R,
    phase: Phase,
    verifier: Option<Srp6Verifier>,
    outcome: Option<SessionOutcome>,
}

impl<S: PacketSink, R: RngCore> AuthSession<S, R> {
    pub fn new(account: AccountConfig, client_info: ClientInfo, sink: S, rng: R) -> Self {
        Self {
            account,
            client_info,
            token: None,
            sink,
            rng,
            phase: Phase::Start,
            verifier: None,
            outcome: None,
        }
    }

    /// Supply an extra-authentication token to attach to the proof request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Begin the session: send the logon-challenge request.
    pub fn start(&mut self) -> Result<()> {
        if self.phase != Phase::Start {
            return Err(AuthError::Session(constants::ERR_SESSION_TERMINAL));
        }
        debug!(account = %self.account.name, "sending logon challenge");
        self.sink
            .enqueue(codec::encode_logon_challenge(&self.client_info, &self.account.name));
        self.phase = Phase::AwaitingChallenge;
        Ok(())
    }

    fn fail(&mut self, error: AuthError) {
        warn!(%error, "authentication session failed");
        self.outcome = Some(SessionOutcome::Failed(error));
        self.phase = Phase::Failed;
        self.sink.close();
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        self.outcome = Some(outcome);
        self.phase = Phase::Done;
        self.sink.close();
    }

    /// Returns `true` if a frame was consumed, `false` if the message is
    /// still incomplete.
    fn handle_challenge(&mut self, buffer: &mut ByteCursor) -> Result<bool> {
        let Some((response, frame_len)) = codec::decode_challenge(buffer.peek())? else {
            return Ok(false);
        };
        buffer.consume(frame_len);

        match response {
            ChallengeResponse::Failure(result) => {
                info!(reason = result.message(), "authentication failed");
                self.fail(AuthError::ServerRejected(result));
            }
            ChallengeResponse::Success(body) => {
                if body.token.is_some() {
                    debug!("server requests an authentication token");
                }

                match Srp6Verifier::process_challenge(
                    &self.account.name,
                    &self.account.password,
                    &body.modulus,
                    &body.generator,
                    &body.server_public,
                    &body.salt,
                    &mut self.rng,
                ) {
                    Err(violation) => self.fail(AuthError::Safeguard(violation)),
                    Ok(verifier) => {
                        debug!(
                            session_key = %hex::encode(verifier.session_key()),
                            "derived session key"
                        );

                        // TODO: compute the real client-binary checksum over
                        // crc_salt instead of random filler.
                        let mut crc_hash = [0u8; PROOF_LENGTH];
                        self.rng.fill_bytes(&mut crc_hash);

                        let packet = codec::encode_logon_proof(
                            verifier.public_ephemeral(),
                            verifier.client_proof(),
                            &crc_hash,
                            self.token.as_deref(),
                        );
                        self.verifier = Some(verifier);
                        self.sink.enqueue(packet);
                        self.phase = Phase::AwaitingProof;
                    }
                }
            }
        }
        Ok(true)
    }

    fn handle_proof(&mut self, buffer: &mut ByteCursor) -> Result<bool> {
        let Some((response, frame_len)) = codec::decode_proof(buffer.peek())? else {
            return Ok(false);
        };
        buffer.consume(frame_len);

        match response {
            ProofResponse::Failure(result) => {
                info!(reason = result.message(), "logon proof rejected");
                self.fail(AuthError::ServerRejected(result));
            }
            ProofResponse::Success(body) => {
                let verifier = self
                    .verifier
                    .as_ref()
                    .ok_or(AuthError::Session(constants::ERR_SESSION_NOT_STARTED))?;

                if !verifier.is_valid_server_proof(&body.server_proof) {
                    // The server claimed success but could not prove it
                    // knows the shared secret.
                    self.fail(AuthError::ServerProofInvalid);
                } else {
                    info!(
                        server_proof = %hex::encode(&body.server_proof),
                        "mutual authentication succeeded"
                    );
                    self.sink.enqueue(codec::encode_realm_list_request());
                    self.phase = Phase::AwaitingRealmList;
                }
            }
        }
        Ok(true)
    }

    fn handle_realm_list(&mut self, buffer: &mut ByteCursor) -> Result<bool> {
        let Some((RealmListResponse { realms }, frame_len)) =
            codec::decode_realm_list(buffer.peek())?
        else {
            return Ok(false);
        };
        buffer.consume(frame_len);

        if realms.is_empty() {
            info!("there are no realms");
            self.finish(SessionOutcome::NoRealms);
        } else {
            info!(count = realms.len(), "received realm list");
            for realm in &realms {
                info!("{realm}");
            }
            self.finish(SessionOutcome::Realms(realms));
        }
        Ok(true)
    }

    fn expected_opcode(&self) -> Option<Opcode> {
        match self.phase {
            Phase::AwaitingChallenge => Some(Opcode::LogonChallenge),
            Phase::AwaitingProof => Some(Opcode::LogonProof),
            Phase::AwaitingRealmList => Some(Opcode::RealmList),
            _ => None,
        }
    }
}

impl<S: PacketSink, R: RngCore> PacketHandler for AuthSession<S, R> {
    fn on_data(&mut self, buffer: &mut ByteCursor) -> Result<()> {
        while buffer.active_size() > 0 {
            let Some(expected) = self.expected_opcode() else {
                break;
            };

            let opcode = buffer.peek()[0];
            if Opcode::from_u8(opcode) != Some(expected) {
                // Never decode an opcode we are not expecting.
                debug!(opcode, phase = ?self.phase, "ignoring unexpected opcode");
                break;
            }

            let consumed = match self.phase {
                Phase::AwaitingChallenge => self.handle_challenge(buffer)?,
                Phase::AwaitingProof => self.handle_proof(buffer)?,
                Phase::AwaitingRealmList => self.handle_realm_list(buffer)?,
                _ => false,
            };

            if !consumed {
                // Partial message: wait for more bytes, consume nothing.
                break;
            }
        }
        Ok(())
    }

    fn on_close(&mut self) {
        if !self.phase.is_terminal() {
            // The connection closed before the handshake completed.
            self.outcome = Some(SessionOutcome::Failed(AuthError::ConnectionClosed));
            self.phase = Phase::Failed;
        }
        debug!(phase = ?self.phase, "session closed");
    }
}
