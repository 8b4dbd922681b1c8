//! SRP6 key-exchange engine, client side.
//!
//! The legacy flavor of SRP6: every value crosses the wire as an unsigned
//! little-endian byte sequence, the digest function is a single 20-byte
//! hash, credentials are uppercased before hashing (a wire-compatibility
//! requirement of the target server, not a security choice), and the
//! 40-byte session key is derived by hashing the even and odd byte streams
//! of the shared secret independently and re-interleaving the digests.
//!
//! The engine is pure: no I/O and no process-wide state. The only way to
//! obtain key material is a successful [`Srp6Verifier::process_challenge`];
//! every safeguard violation aborts the whole computation with a distinct
//! error before any key material exists.

use num_bigint::BigUint;
use rand::RngCore;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::core::bigint::{from_le, to_le, to_le_padded};
use crate::error::SafeguardViolation;

/// Length of the client/server public ephemerals and the shared secret, in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;
/// Length of the evidence values M1/M2, in bytes.
pub const PROOF_LENGTH: usize = 20;
/// Length of the interleaved session key, in bytes.
pub const SESSION_KEY_LENGTH: usize = 40;
/// Entropy of the client private ephemeral, in bytes.
pub const PRIVATE_EPHEMERAL_LENGTH: usize = 19;

/// Fixed SRP6 multiplier `k` used by the legacy protocol.
const MULTIPLIER: u32 = 3;

/// One independent 20-byte digest over the concatenation of `parts`.
fn sha1_concat(parts: &[&[u8]]) -> [u8; PROOF_LENGTH] {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Result of a successful SRP6 challenge computation.
///
/// Holds the externally retained artifacts of one authentication attempt:
/// the client public ephemeral `A`, the client evidence value `M1`, the
/// session key `K`, and the expected server evidence value `M2`. Created
/// fresh per attempt, never reused, never persisted.
pub struct Srp6Verifier {
    public_ephemeral: [u8; PUBLIC_KEY_LENGTH],
    client_proof: [u8; PROOF_LENGTH],
    session_key: [u8; SESSION_KEY_LENGTH],
    server_proof: [u8; PROOF_LENGTH],
}

impl Srp6Verifier {
    /// Run the full client-side SRP6 computation against the server's
    /// challenge parameters.
    ///
    /// `modulus`, `generator`, `server_public` and `salt` are the raw
    /// little-endian byte sequences as decoded from the challenge response.
    /// The random source is passed explicitly so key generation is testable
    /// with a deterministic substitute.
    ///
    /// # Errors
    /// Returns a [`SafeguardViolation`] if any invariant fails:
    /// `B mod N != 0`, `a < N`, `u != 0`, `S > 0`. An aborted computation
    /// leaves no key material populated.
    pub fn process_challenge(
        account_name: &str,
        account_password: &str,
        modulus: &[u8],
        generator: &[u8],
        server_public: &[u8],
        salt: &[u8],
        rng: &mut impl RngCore,
    ) -> Result<Self, SafeguardViolation> {
        // 19 bytes of entropy with the top bit of the most significant byte
        // forced set, for a fixed bit length and a non-zero value.
        let mut private = [0u8; PRIVATE_EPHEMERAL_LENGTH];
        rng.fill_bytes(&mut private);
        private[PRIVATE_EPHEMERAL_LENGTH - 1] |= 0x80;

        let modulus = from_le(modulus);
        let generator = from_le(generator);
        let server_public = from_le(server_public);
        let salt = from_le(salt);
        let private = from_le(&private);
        let multiplier = BigUint::from(MULTIPLIER);

        if modulus.bits() == 0 || (&server_public % &modulus).bits() == 0 {
            return Err(SafeguardViolation::PublicEphemeralZero);
        }

        if private >= modulus {
            return Err(SafeguardViolation::PrivateEphemeralTooLarge);
        }

        let account_name = account_name.to_uppercase();
        let account_password = account_password.to_uppercase();

        // gn = H(g) xor H(N)
        let generator_hash = sha1_concat(&[&to_le(&generator)]);
        let modulus_hash = sha1_concat(&[&to_le(&modulus)]);
        let mut gn = [0u8; PROOF_LENGTH];
        for (out, (g, n)) in gn.iter_mut().zip(generator_hash.iter().zip(&modulus_hash)) {
            *out = g ^ n;
        }
        let gn = from_le(&gn);

        // x = H(s, H(name ":" password))
        let credentials_hash =
            sha1_concat(&[format!("{account_name}:{account_password}").as_bytes()]);
        let x = from_le(&sha1_concat(&[&to_le(&salt), &credentials_hash]));

        // A = g^a mod N
        let public = generator.modpow(&private, &modulus);

        // u = H(A, B)
        let u = from_le(&sha1_concat(&[&to_le(&public), &to_le(&server_public)]));
        if u.bits() == 0 {
            return Err(SafeguardViolation::ScramblingValueZero);
        }

        // S = ((B + k * (N - g^x mod N)) mod N) ^ (a + u * x) mod N
        let base =
            (&server_public + &multiplier * (&modulus - generator.modpow(&x, &modulus))) % &modulus;
        let shared_secret = base.modpow(&(&private + &u * &x), &modulus);
        if shared_secret.bits() == 0 {
            return Err(SafeguardViolation::SharedSecretNotPositive);
        }

        // K: interleave the digests of the even and odd byte streams of S.
        let secret_bytes: [u8; PUBLIC_KEY_LENGTH] = to_le_padded(&shared_secret);
        let mut even = [0u8; PUBLIC_KEY_LENGTH / 2];
        let mut odd = [0u8; PUBLIC_KEY_LENGTH / 2];
        for i in 0..PUBLIC_KEY_LENGTH / 2 {
            even[i] = secret_bytes[i * 2];
            odd[i] = secret_bytes[i * 2 + 1];
        }
        let even_hash = sha1_concat(&[&even]);
        let odd_hash = sha1_concat(&[&odd]);
        let mut session_key = [0u8; SESSION_KEY_LENGTH];
        for i in 0..PROOF_LENGTH {
            session_key[i * 2] = even_hash[i];
            session_key[i * 2 + 1] = odd_hash[i];
        }
        let session_key_int = from_le(&session_key);

        // M1 = H(gn, H(name), s, A, B, K)
        let name_hash = sha1_concat(&[account_name.as_bytes()]);
        let client_proof = sha1_concat(&[
            &to_le(&gn),
            &name_hash,
            &to_le(&salt),
            &to_le(&public),
            &to_le(&server_public),
            &to_le(&session_key_int),
        ]);

        // M2 = H(A, M1, K)
        let server_proof = sha1_concat(&[
            &to_le(&public),
            &to_le(&from_le(&client_proof)),
            &to_le(&session_key_int),
        ]);

        debug!("SRP6 challenge processed, session key derived");

        Ok(Self {
            public_ephemeral: to_le_padded(&public),
            client_proof,
            session_key,
            server_proof,
        })
    }

    /// Client public ephemeral `A`, zero-padded to 32 little-endian bytes.
    pub fn public_ephemeral(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public_ephemeral
    }

    /// Client evidence value `M1`.
    pub fn client_proof(&self) -> &[u8; PROOF_LENGTH] {
        &self.client_proof
    }

    /// 40-byte interleaved session key `K`.
    pub fn session_key(&self) -> &[u8; SESSION_KEY_LENGTH] {
        &self.session_key
    }

    /// Locally computed server evidence value `M2`.
    pub fn server_proof(&self) -> &[u8; PROOF_LENGTH] {
        &self.server_proof
    }

    /// Constant-structure comparison of the server's presented `M2` against
    /// the locally computed value. A match proves the server also derived
    /// the password-based shared secret.
    pub fn is_valid_server_proof(&self, value: &[u8]) -> bool {
        if value.len() != PROOF_LENGTH {
            return false;
        }
        let mut diff = 0u8;
        for (a, b) in self.server_proof.iter().zip(value) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl std::fmt::Debug for Srp6Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("Srp6Verifier").finish_non_exhaustive()
    }
}
