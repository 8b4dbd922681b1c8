//! Key-exchange tests against a pinned exchange.
//!
//! The server values below come from one complete exchange against a
//! reference realm daemon using the well-known 256-bit modulus, so every
//! derived quantity has a known-good expected value.

use rand::RngCore;

use crate::error::SafeguardViolation;
use crate::protocol::srp6::Srp6Verifier;

/// Deterministic byte source for key generation in tests.
pub struct FixedRng {
    bytes: Vec<u8>,
    pos: usize,
}

impl FixedRng {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            pos: 0,
        }
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest {
            *byte = self.bytes[self.pos % self.bytes.len()];
            self.pos += 1;
        }
    }
}

fn hex(s: &str) -> Vec<u8> {
    assert!(s.len() % 2 == 0);
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

/// Little-endian bytes of the well-known 256-bit modulus.
pub const MODULUS_LE: &str = "894b645e89e1535bbdad5b8b290650530801b18ebfbf5e8fab3c82872a3e9bb7";
/// Client private ephemeral drawn by [`FixedRng`]; top bit already set.
pub const PRIVATE_LE: &str = "1112131415161718191a1b1c1d1e1f202122a3";
/// Server public ephemeral from the pinned exchange.
pub const SERVER_PUBLIC_LE: &str =
    "e757c5ec4ceb68cf2faaa59c61f0c4957bddc2075a2d17ee0260df9632576a96";
/// Client public ephemeral the fixed private key must produce.
pub const CLIENT_PUBLIC_LE: &str =
    "6475312bcdcaed0da4289e35f67bb40783b2db571e9aef473e8e6cf0c4e65375";
pub const CLIENT_PROOF: &str = "2196039fabc631864e332f13b44162377e62b17d";
pub const SERVER_PROOF: &str = "dfbbb79878641e0df1c8e6bae216134c3dfb9ac2";
pub const SESSION_KEY: &str =
    "9d411a534e83f66f0ea5ddcd1bb039b5323f13e8c465a56d8289167d998ed55800622fd7bcdd1db6";

pub const ACCOUNT: &str = "SRP6";
pub const PASSWORD: &str = "AAA123";

pub fn pinned_salt() -> Vec<u8> {
    (1..=32).collect()
}

fn pinned_verifier() -> Srp6Verifier {
    let mut rng = FixedRng::new(&hex(PRIVATE_LE));
    Srp6Verifier::process_challenge(
        ACCOUNT,
        PASSWORD,
        &hex(MODULUS_LE),
        &[7],
        &hex(SERVER_PUBLIC_LE),
        &pinned_salt(),
        &mut rng,
    )
    .unwrap()
}

#[test]
fn derives_pinned_key_material() {
    let verifier = pinned_verifier();
    assert_eq!(verifier.public_ephemeral().as_slice(), hex(CLIENT_PUBLIC_LE));
    assert_eq!(verifier.client_proof().as_slice(), hex(CLIENT_PROOF));
    assert_eq!(verifier.server_proof().as_slice(), hex(SERVER_PROOF));
    assert_eq!(verifier.session_key().as_slice(), hex(SESSION_KEY));
}

#[test]
fn credentials_are_case_insensitive() {
    let mut rng = FixedRng::new(&hex(PRIVATE_LE));
    let lower = Srp6Verifier::process_challenge(
        "srp6",
        "aaa123",
        &hex(MODULUS_LE),
        &[7],
        &hex(SERVER_PUBLIC_LE),
        &pinned_salt(),
        &mut rng,
    )
    .unwrap();
    assert_eq!(lower.client_proof(), pinned_verifier().client_proof());
}

#[test]
fn server_proof_validation() {
    let verifier = pinned_verifier();
    assert!(verifier.is_valid_server_proof(&hex(SERVER_PROOF)));

    let mut tampered = hex(SERVER_PROOF);
    tampered[3] ^= 0x01;
    assert!(!verifier.is_valid_server_proof(&tampered));
    assert!(!verifier.is_valid_server_proof(&tampered[..19]));
    assert!(!verifier.is_valid_server_proof(&[]));
}

#[test]
fn rejects_server_public_multiple_of_modulus() {
    // B == N, so B mod N is zero.
    let mut rng = FixedRng::new(&hex(PRIVATE_LE));
    let result = Srp6Verifier::process_challenge(
        ACCOUNT,
        PASSWORD,
        &hex(MODULUS_LE),
        &[7],
        &hex(MODULUS_LE),
        &pinned_salt(),
        &mut rng,
    );
    assert_eq!(result.unwrap_err(), SafeguardViolation::PublicEphemeralZero);
}

#[test]
fn rejects_zero_server_public() {
    let mut rng = FixedRng::new(&hex(PRIVATE_LE));
    let result = Srp6Verifier::process_challenge(
        ACCOUNT,
        PASSWORD,
        &hex(MODULUS_LE),
        &[7],
        &[0u8; 32],
        &pinned_salt(),
        &mut rng,
    );
    assert_eq!(result.unwrap_err(), SafeguardViolation::PublicEphemeralZero);
}

#[test]
fn rejects_private_ephemeral_not_below_modulus() {
    // A degenerate 1-byte modulus is far below any 19-byte private key.
    let mut rng = FixedRng::new(&hex(PRIVATE_LE));
    let result = Srp6Verifier::process_challenge(
        ACCOUNT,
        PASSWORD,
        &[7],
        &[2],
        &[3],
        &pinned_salt(),
        &mut rng,
    );
    assert_eq!(
        result.unwrap_err(),
        SafeguardViolation::PrivateEphemeralTooLarge
    );
}
