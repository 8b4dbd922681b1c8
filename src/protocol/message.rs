//! # Protocol Messages
//!
//! Typed records for the legacy authentication protocol: wire opcodes,
//! server result codes, challenge/proof responses, and realm records.
//!
//! Messages are transient: the codec decodes them out of the receive buffer,
//! the session acts on them, and they are discarded. Numeric values are
//! fixed by the legacy protocol and must match byte-for-byte.

use bitflags::bitflags;
use std::fmt;

/// Single-byte wire opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    LogonChallenge = 0x00,
    LogonProof = 0x01,
    RealmList = 0x10,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Opcode::LogonChallenge),
            0x01 => Some(Opcode::LogonProof),
            0x10 => Some(Opcode::RealmList),
            _ => None,
        }
    }
}

/// Server result codes for the challenge and proof phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Success,
    FailBanned,
    FailUnknownAccount,
    FailIncorrectPassword,
    FailAlreadyOnline,
    FailNoTime,
    FailDbBusy,
    FailVersionInvalid,
    FailVersionUpdate,
    FailSuspended,
    SuccessSurvey,
    FailParentControl,
    Unknown(u8),
}

impl AuthResult {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => AuthResult::Success,
            0x03 => AuthResult::FailBanned,
            0x04 => AuthResult::FailUnknownAccount,
            0x05 => AuthResult::FailIncorrectPassword,
            0x06 => AuthResult::FailAlreadyOnline,
            0x07 => AuthResult::FailNoTime,
            0x08 => AuthResult::FailDbBusy,
            0x09 => AuthResult::FailVersionInvalid,
            0x0A => AuthResult::FailVersionUpdate,
            0x0C => AuthResult::FailSuspended,
            0x0E => AuthResult::SuccessSurvey,
            0x0F => AuthResult::FailParentControl,
            other => AuthResult::Unknown(other),
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, AuthResult::Success)
    }

    /// Fixed result-code-to-message table surfaced to the user on failure.
    pub fn message(self) -> &'static str {
        match self {
            AuthResult::Success => "Success!",
            AuthResult::FailBanned => {
                "This account has been closed and is no longer available for use. \
                 Please check your server's website for further information."
            }
            AuthResult::FailUnknownAccount | AuthResult::FailIncorrectPassword => {
                "The information you have entered is not valid. Please check the \
                 spelling of the account name and password. If you need help in \
                 retrieving a lost or stolen password, see your server's website \
                 for more information."
            }
            AuthResult::FailAlreadyOnline => {
                "This account is already logged in. Please check the spelling and \
                 try again."
            }
            AuthResult::FailNoTime => {
                "You have used up your prepaid time for this account. Please \
                 purchase more to continue playing."
            }
            AuthResult::FailDbBusy => {
                "Could not log in at this time. Please try again later."
            }
            AuthResult::FailVersionInvalid => {
                "Unable to validate game version. This may be caused by file \
                 corruption or interference of another program. Please visit your \
                 server's website for more information and possible solutions to \
                 this issue."
            }
            AuthResult::FailVersionUpdate => "Downloading...",
            AuthResult::FailSuspended => {
                "This account has been temporarily suspended. Please visit your \
                 server's website for further information."
            }
            AuthResult::SuccessSurvey => "Connected.",
            AuthResult::FailParentControl => {
                "Access to this account has been blocked by parental controls. \
                 Your settings may be changed in your account preferences at your \
                 server's website."
            }
            AuthResult::Unknown(_) => "<Unknown>",
        }
    }
}

bitflags! {
    /// Security-flags byte of the challenge response. The three low bits
    /// independently gate the optional trailing sections, concatenated in
    /// PIN, matrix, token order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SecurityFlags: u8 {
        const PIN = 0x01;
        const MATRIX = 0x02;
        const TOKEN = 0x04;
    }
}

/// PIN-security section of the challenge response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinChallenge {
    pub grid_seed: u32,
    pub salt_lo: u64,
    pub salt_hi: u64,
}

/// Matrix-card section of the challenge response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixChallenge {
    pub width: u8,
    pub height: u8,
    pub digit_count: u8,
    pub challenge_count: u8,
    pub seed: u64,
}

/// Token section of the challenge response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenChallenge {
    pub required: bool,
}

/// Successful challenge-response body: the server's SRP6 parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeBody {
    /// Server public ephemeral B, 32 bytes little-endian.
    pub server_public: [u8; 32],
    /// Generator g; length-prefixed on the wire.
    pub generator: Vec<u8>,
    /// Modulus N; length-prefixed on the wire, at most 32 bytes.
    pub modulus: Vec<u8>,
    pub salt: [u8; 32],
    pub crc_salt: [u8; 16],
    pub security: SecurityFlags,
    pub pin: Option<PinChallenge>,
    pub matrix: Option<MatrixChallenge>,
    pub token: Option<TokenChallenge>,
}

/// Challenge response, shaped by its header's result code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeResponse {
    Success(ChallengeBody),
    Failure(AuthResult),
}

/// Successful proof-response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofBody {
    /// Server evidence value M2.
    pub server_proof: [u8; 20],
    pub account_flags: u32,
    pub survey_id: u32,
    pub unknown: u16,
}

/// Proof response, shaped by its header's result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofResponse {
    Success(ProofBody),
    Failure(AuthResult),
}

bitflags! {
    /// Per-realm flags bitmask. `SPECIFY_BUILD` gates the trailing
    /// client-version tuple of the realm record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RealmFlags: u8 {
        const INVALID = 0x01;
        const OFFLINE = 0x02;
        const SPECIFY_BUILD = 0x04;
        const UNK1 = 0x08;
        const UNK2 = 0x10;
        const RECOMMENDED = 0x20;
        const NEW = 0x40;
        const FULL = 0x80;
    }
}

/// Exact client version a realm requires, present when
/// [`RealmFlags::SPECIFY_BUILD`] is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealmVersion {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
    pub build: u16,
}

/// One realm record from the realm-list response. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Realm {
    pub icon: u8,
    pub locked: bool,
    pub flags: RealmFlags,
    pub name: String,
    pub address: String,
    pub population: f32,
    pub characters: u8,
    pub timezone: u8,
    pub id: u8,
    pub version: Option<RealmVersion>,
}

impl Realm {
    pub fn is_online(&self) -> bool {
        !self.flags.contains(RealmFlags::OFFLINE)
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " - {} [{} ] ({})",
            self.name,
            self.address,
            if self.is_online() { "Online" } else { "Offline" }
        )
    }
}

/// Realm-list response: the ordered realm sequence for this attempt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RealmListResponse {
    pub realms: Vec<Realm>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_match_wire_values() {
        assert_eq!(Opcode::LogonChallenge as u8, 0x00);
        assert_eq!(Opcode::LogonProof as u8, 0x01);
        assert_eq!(Opcode::RealmList as u8, 0x10);
        assert_eq!(Opcode::from_u8(0x10), Some(Opcode::RealmList));
        assert_eq!(Opcode::from_u8(0x02), None);
    }

    #[test]
    fn result_table_covers_shared_messages() {
        // Unknown-account and incorrect-password share one message.
        assert_eq!(
            AuthResult::FailUnknownAccount.message(),
            AuthResult::FailIncorrectPassword.message()
        );
        assert!(AuthResult::Success.is_success());
        assert!(!AuthResult::FailBanned.is_success());
        assert_eq!(AuthResult::from_u8(0x42), AuthResult::Unknown(0x42));
    }

    #[test]
    fn realm_display_matches_legacy_format() {
        let realm = Realm {
            icon: 1,
            locked: false,
            flags: RealmFlags::OFFLINE,
            name: "Greymane".into(),
            address: "127.0.0.1:8085".into(),
            population: 1.0,
            characters: 2,
            timezone: 1,
            id: 1,
            version: None,
        };
        assert_eq!(realm.to_string(), " - Greymane [127.0.0.1:8085 ] (Offline)");
    }
}
