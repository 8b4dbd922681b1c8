//! # Packet Codec
//!
//! Stateless framing for the authentication protocol: completeness checks,
//! decoding of server responses, and encoding of client requests.
//!
//! Decoders operate on a borrowed view of the receive buffer and never
//! mutate it; they return `Ok(None)` while the frame is still incomplete and
//! `Ok(Some((message, frame_len)))` once a whole message is present, leaving
//! it to the caller to consume exactly `frame_len` bytes. Variable-length
//! layouts (flag-gated trailing sections, per-record version suffixes) are
//! re-verified against the buffer length after every conditional part —
//! nothing is decoded before the whole frame is known to be buffered.

use bytes::Bytes;

use crate::config::ClientInfo;
use crate::core::buffer::ByteCursor;
use crate::error::{constants, AuthError, Result};
use crate::protocol::message::{
    AuthResult, ChallengeBody, ChallengeResponse, MatrixChallenge, Opcode, PinChallenge,
    ProofBody, ProofResponse, Realm, RealmFlags, RealmListResponse, RealmVersion, SecurityFlags,
    TokenChallenge,
};

/// Protocol version byte of the logon-challenge request.
const CHALLENGE_PROTOCOL_VERSION: u8 = 8;

const CHALLENGE_HEADER_LEN: usize = 3;
const CHALLENGE_BODY_LEN: usize = 116;
const PIN_SECTION_LEN: usize = 20;
const MATRIX_SECTION_LEN: usize = 12;
const TOKEN_SECTION_LEN: usize = 1;

const PROOF_HEADER_LEN: usize = 2;
const PROOF_BODY_LEN: usize = 30;
const PROOF_ERROR_LEN: usize = 2;

const REALM_LIST_HEADER_LEN: usize = 9;
/// Bytes of the realm-list frame not covered by its length field
/// (the opcode and the length field itself).
const REALM_LIST_LENGTH_BASE: usize = 3;

/// Optional trailing sections of the challenge response, in wire order.
/// Each section is present iff its flag bit is set; its offset is the sum
/// of the sizes of all present sections that precede it.
const CHALLENGE_SECTIONS: [(SecurityFlags, usize); 3] = [
    (SecurityFlags::PIN, PIN_SECTION_LEN),
    (SecurityFlags::MATRIX, MATRIX_SECTION_LEN),
    (SecurityFlags::TOKEN, TOKEN_SECTION_LEN),
];

/// Byte offset of `section` within the optional trailing area, given the
/// challenge's security flags.
fn section_offset(flags: SecurityFlags, section: SecurityFlags) -> usize {
    CHALLENGE_SECTIONS
        .iter()
        .take_while(|(bit, _)| *bit != section)
        .filter(|(bit, _)| flags.contains(*bit))
        .map(|(_, len)| len)
        .sum()
}

/// Sequential field reader over a fully buffered frame.
struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(AuthError::MalformedPacket(constants::ERR_TRUNCATED_FRAME));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64_le(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(b);
        Ok(u64::from_le_bytes(out))
    }

    fn f32_le(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// NUL-terminated string field.
    fn cstr(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(AuthError::MalformedPacket(constants::ERR_UNTERMINATED_STRING))?;
        let value = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(value)
    }
}

/// Decode a challenge response from the front of `buf`.
///
/// Returns `Ok(None)` while the frame is incomplete. A non-success result
/// code yields a header-only failure frame.
pub fn decode_challenge(buf: &[u8]) -> Result<Option<(ChallengeResponse, usize)>> {
    if buf.len() < CHALLENGE_HEADER_LEN {
        return Ok(None);
    }

    let result = AuthResult::from_u8(buf[2]);
    if !result.is_success() {
        return Ok(Some((ChallengeResponse::Failure(result), CHALLENGE_HEADER_LEN)));
    }

    let mut frame_len = CHALLENGE_HEADER_LEN + CHALLENGE_BODY_LEN;
    if buf.len() < frame_len {
        return Ok(None);
    }

    // The flags byte is the last byte of the fixed body. Re-verify the
    // buffer length after each optional section is added; never assume all
    // three are present.
    let flags = SecurityFlags::from_bits_truncate(buf[frame_len - 1]);
    for (bit, len) in CHALLENGE_SECTIONS {
        if flags.contains(bit) {
            frame_len += len;
            if buf.len() < frame_len {
                return Ok(None);
            }
        }
    }

    let mut reader = FieldReader::new(&buf[CHALLENGE_HEADER_LEN..frame_len]);
    let server_public: [u8; 32] = reader.array()?;
    let generator_len = reader.u8()? as usize;
    let generator_field = reader.take(1)?;
    let generator = generator_field[..generator_len.min(1)].to_vec();
    let modulus_len = reader.u8()? as usize;
    let modulus_field = reader.take(32)?;
    let modulus = modulus_field[..modulus_len.min(32)].to_vec();
    let salt: [u8; 32] = reader.array()?;
    let crc_salt: [u8; 16] = reader.array()?;
    let _flags_byte = reader.u8()?;

    let pin = if flags.contains(SecurityFlags::PIN) {
        debug_assert_eq!(reader.pos, CHALLENGE_BODY_LEN + section_offset(flags, SecurityFlags::PIN));
        Some(PinChallenge {
            grid_seed: reader.u32_le()?,
            salt_lo: reader.u64_le()?,
            salt_hi: reader.u64_le()?,
        })
    } else {
        None
    };

    let matrix = if flags.contains(SecurityFlags::MATRIX) {
        debug_assert_eq!(
            reader.pos,
            CHALLENGE_BODY_LEN + section_offset(flags, SecurityFlags::MATRIX)
        );
        Some(MatrixChallenge {
            width: reader.u8()?,
            height: reader.u8()?,
            digit_count: reader.u8()?,
            challenge_count: reader.u8()?,
            seed: reader.u64_le()?,
        })
    } else {
        None
    };

    let token = if flags.contains(SecurityFlags::TOKEN) {
        debug_assert_eq!(
            reader.pos,
            CHALLENGE_BODY_LEN + section_offset(flags, SecurityFlags::TOKEN)
        );
        Some(TokenChallenge {
            required: reader.u8()? != 0,
        })
    } else {
        None
    };

    let body = ChallengeBody {
        server_public,
        generator,
        modulus,
        salt,
        crc_salt,
        security: flags,
        pin,
        matrix,
        token,
    };
    Ok(Some((ChallengeResponse::Success(body), frame_len)))
}

/// Decode a proof response from the front of `buf`.
///
/// The header's result code alone disambiguates the body shape, so the
/// length check branches on it before computing the frame length.
pub fn decode_proof(buf: &[u8]) -> Result<Option<(ProofResponse, usize)>> {
    if buf.len() < PROOF_HEADER_LEN {
        return Ok(None);
    }

    let result = AuthResult::from_u8(buf[1]);
    if !result.is_success() {
        let frame_len = PROOF_HEADER_LEN + PROOF_ERROR_LEN;
        if buf.len() < frame_len {
            return Ok(None);
        }
        return Ok(Some((ProofResponse::Failure(result), frame_len)));
    }

    let frame_len = PROOF_HEADER_LEN + PROOF_BODY_LEN;
    if buf.len() < frame_len {
        return Ok(None);
    }

    let mut reader = FieldReader::new(&buf[PROOF_HEADER_LEN..frame_len]);
    let body = ProofBody {
        server_proof: reader.array()?,
        account_flags: reader.u32_le()?,
        survey_id: reader.u32_le()?,
        unknown: reader.u16_le()?,
    };
    Ok(Some((ProofResponse::Success(body), frame_len)))
}

/// Decode a realm-list response from the front of `buf`.
///
/// The length field covers everything after itself except the opcode and
/// the field itself, so the total frame is `3 + length`. Records are not
/// fixed size: each record's own flags byte gates its version suffix, so
/// records parse sequentially with each one's end used as the next start.
pub fn decode_realm_list(buf: &[u8]) -> Result<Option<(RealmListResponse, usize)>> {
    if buf.len() < REALM_LIST_HEADER_LEN {
        return Ok(None);
    }

    let length = u16::from_le_bytes([buf[1], buf[2]]) as usize;
    let count = u16::from_le_bytes([buf[7], buf[8]]);

    if count == 0 {
        // No realms: terminal for the session, nothing further to parse.
        return Ok(Some((RealmListResponse::default(), REALM_LIST_HEADER_LEN)));
    }

    let frame_len = REALM_LIST_LENGTH_BASE + length;
    if buf.len() < frame_len {
        return Ok(None);
    }
    if frame_len < REALM_LIST_HEADER_LEN {
        return Err(AuthError::MalformedPacket(constants::ERR_TRUNCATED_FRAME));
    }

    let mut reader = FieldReader::new(&buf[REALM_LIST_HEADER_LEN..frame_len]);
    let mut realms = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let icon = reader.u8()?;
        let locked = reader.u8()? != 0;
        let flags = RealmFlags::from_bits_truncate(reader.u8()?);
        let name = reader.cstr()?;
        let address = reader.cstr()?;
        let population = reader.f32_le()?;
        let characters = reader.u8()?;
        let timezone = reader.u8()?;
        let id = reader.u8()?;

        let version = if flags.contains(RealmFlags::SPECIFY_BUILD) {
            Some(RealmVersion {
                major: reader.u8()?,
                minor: reader.u8()?,
                bugfix: reader.u8()?,
                build: reader.u16_le()?,
            })
        } else {
            None
        };

        realms.push(Realm {
            icon,
            locked,
            flags,
            name,
            address,
            population,
            characters,
            timezone,
            id,
            version,
        });
    }

    // Trailing 2-byte padding after the last record.
    if reader.remaining() < 2 {
        return Err(AuthError::MalformedPacket(constants::ERR_REALM_RECORD));
    }

    Ok(Some((RealmListResponse { realms }, frame_len)))
}

/// Encode the logon-challenge request for the given client identity.
///
/// The size field counts every byte after itself; the platform/OS/locale
/// tags are transmitted reversed, the first two NUL-padded to four bytes.
pub fn encode_logon_challenge(info: &ClientInfo, account_name: &str) -> Bytes {
    let mut body = ByteCursor::new();
    body.put_cstr(&info.game_name);
    body.put_u8(info.version[0]);
    body.put_u8(info.version[1]);
    body.put_u8(info.version[2]);
    body.put_u16_le(info.build);
    put_reversed_tag(&mut body, &info.platform);
    body.put_u8(0);
    put_reversed_tag(&mut body, &info.os);
    body.put_u8(0);
    put_reversed_tag(&mut body, &info.locale);
    body.put_u32_le(info.timezone);
    body.put_bytes(&info.address.octets());
    body.put_u8(account_name.len() as u8);
    body.put_str(account_name);

    let mut packet = ByteCursor::new();
    packet.put_u8(Opcode::LogonChallenge as u8);
    packet.put_u8(CHALLENGE_PROTOCOL_VERSION);
    packet.put_u16_le(body.written().len() as u16);
    packet.put_bytes(body.written());
    Bytes::copy_from_slice(packet.written())
}

/// Encode the logon-proof request.
///
/// The trailing block is the extra-authentication token, signaled by a
/// leading flag byte; without a token the block is two zero bytes.
pub fn encode_logon_proof(
    public_ephemeral: &[u8; 32],
    client_proof: &[u8; 20],
    crc_hash: &[u8; 20],
    token: Option<&str>,
) -> Bytes {
    let mut packet = ByteCursor::new();
    packet.put_u8(Opcode::LogonProof as u8);
    packet.put_bytes(public_ephemeral);
    packet.put_bytes(client_proof);
    packet.put_bytes(crc_hash);

    match token {
        None | Some("") => {
            packet.put_u8(0);
            packet.put_u8(0);
        }
        Some(token) => {
            packet.put_u8(1);
            packet.put_u8(0x04);
            packet.put_u8(token.len() as u8 + 1);
            packet.put_cstr(token);
        }
    }

    Bytes::copy_from_slice(packet.written())
}

/// Encode the realm-list request.
pub fn encode_realm_list_request() -> Bytes {
    let mut packet = ByteCursor::new();
    packet.put_u8(Opcode::RealmList as u8);
    packet.put_u32_le(0x1000);
    Bytes::copy_from_slice(packet.written())
}

fn put_reversed_tag(buf: &mut ByteCursor, tag: &str) {
    for &byte in tag.as_bytes().iter().rev() {
        buf.put_u8(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_offsets_sum_present_predecessors() {
        let all = SecurityFlags::all();
        assert_eq!(section_offset(all, SecurityFlags::PIN), 0);
        assert_eq!(section_offset(all, SecurityFlags::MATRIX), PIN_SECTION_LEN);
        assert_eq!(
            section_offset(all, SecurityFlags::TOKEN),
            PIN_SECTION_LEN + MATRIX_SECTION_LEN
        );

        let token_only = SecurityFlags::TOKEN;
        assert_eq!(section_offset(token_only, SecurityFlags::TOKEN), 0);

        let matrix_token = SecurityFlags::MATRIX | SecurityFlags::TOKEN;
        assert_eq!(section_offset(matrix_token, SecurityFlags::TOKEN), MATRIX_SECTION_LEN);
    }

    #[test]
    fn logon_challenge_layout() {
        let info = ClientInfo::default();
        let packet = encode_logon_challenge(&info, "srp6");

        assert_eq!(packet[0], 0x00);
        assert_eq!(packet[1], 8);
        // Size field covers name length + the 30 fixed body bytes.
        assert_eq!(u16::from_le_bytes([packet[2], packet[3]]), 4 + 30);
        assert_eq!(&packet[4..8], b"WoW\0");
        assert_eq!(&packet[8..11], &[1, 12, 1]);
        assert_eq!(u16::from_le_bytes([packet[11], packet[12]]), 8606);
        assert_eq!(&packet[13..17], b"68x\0");
        assert_eq!(&packet[17..21], b"niW\0");
        assert_eq!(&packet[21..25], b"BGne");
        assert_eq!(u32::from_le_bytes([packet[25], packet[26], packet[27], packet[28]]), 0x3C);
        assert_eq!(&packet[29..33], &[127, 0, 0, 1]);
        assert_eq!(packet[33], 4);
        assert_eq!(&packet[34..], b"srp6");
    }

    #[test]
    fn logon_proof_token_block() {
        let a = [0u8; 32];
        let m1 = [1u8; 20];
        let crc = [2u8; 20];

        let without = encode_logon_proof(&a, &m1, &crc, None);
        assert_eq!(without.len(), 1 + 32 + 20 + 20 + 2);
        assert_eq!(&without[without.len() - 2..], &[0, 0]);

        let with = encode_logon_proof(&a, &m1, &crc, Some("123456"));
        assert_eq!(with[73], 1);
        assert_eq!(with[74], 0x04);
        assert_eq!(with[75], 7);
        assert_eq!(&with[76..], b"123456\0");
    }

    #[test]
    fn realm_list_request_layout() {
        let packet = encode_realm_list_request();
        assert_eq!(packet.as_ref(), &[0x10, 0x00, 0x10, 0x00, 0x00]);
    }
}
