//! # Core Components
//!
//! Low-level building blocks shared by the codec, the SRP6 engine, and the
//! transport.
//!
//! ## Components
//! - **Buffer**: growable byte buffer with independent read/write cursors,
//!   used to stage inbound bytes and build outbound frames
//! - **Bigint**: the single place where the wire's unsigned little-endian
//!   big-integer convention is encoded and decoded
//!
//! ## Wire Conventions
//! - Multi-byte integers are little-endian
//! - Big integers are unsigned little-endian; hashing operands use the
//!   minimal encoding (trailing zero bytes stripped)

pub mod bigint;
pub mod buffer;

pub use buffer::ByteCursor;
