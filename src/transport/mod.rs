//! # Transport Layer
//!
//! Asynchronous socket transport with a single receive and at most one send
//! in flight, an ordered outbound queue, and idempotent half-close
//! semantics.
//!
//! The seams are traits: [`PacketSink`] is the outbound surface a protocol
//! session writes through, and [`PacketHandler`] is the inbound hook the
//! read loop drives. Tests implement both over in-memory pipes.

pub mod socket;

use bytes::Bytes;

use crate::core::buffer::ByteCursor;
use crate::error::Result;

pub use socket::{Connection, Transport};

/// Outbound surface of a transport: ordered enqueue plus close semantics.
pub trait PacketSink {
    /// Append a payload to the outbound queue; payloads are transmitted in
    /// enqueue order.
    fn enqueue(&self, payload: Bytes);

    /// Close the connection now. Idempotent.
    fn close(&self);

    /// Request a close once the outbound queue has drained.
    fn close_after_flush(&self);

    /// Whether the connection is still open and not closing.
    fn is_open(&self) -> bool;
}

/// Inbound hook driven by the transport's read loop.
pub trait PacketHandler {
    /// Invoked after each receive completion with the buffer of contiguous
    /// arrived bytes. The handler consumes whole messages from the front
    /// and leaves partial messages untouched for the next completion.
    fn on_data(&mut self, buffer: &mut ByteCursor) -> Result<()>;

    /// Invoked exactly once when the connection has closed.
    fn on_close(&mut self) {}
}
