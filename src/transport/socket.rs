//! Socket transport: one receive and at most one send in flight.
//!
//! The transport owns the stream's two halves, the inbound [`ByteCursor`],
//! and a FIFO queue of outbound payloads. Reads are driven by
//! [`Connection::run`]; writes are driven by a background task started when
//! the queue transitions from idle to busy, guarded by an atomic
//! test-and-set on the `writing` flag. The `closed` flag is the single
//! idempotent open-to-closed transition; a second closer observes it
//! already set and does nothing.
//!
//! The transport is generic over the stream so production runs over
//! `TcpStream` and tests run over `tokio::io::duplex`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::{debug, trace, warn};

use crate::core::buffer::{ByteCursor, READ_BLOCK_SIZE};
use crate::error::Result;
use crate::transport::{PacketHandler, PacketSink};

/// One queued outbound payload: immutable bytes plus a cursor tracking how
/// much has been transmitted. Owned by the transport until fully sent.
struct OutboundEntry {
    payload: Bytes,
    sent: usize,
}

impl OutboundEntry {
    fn remaining(&self) -> Bytes {
        self.payload.slice(self.sent..)
    }

    fn is_done(&self) -> bool {
        self.sent >= self.payload.len()
    }
}

struct Shared<S> {
    writer: AsyncMutex<WriteHalf<S>>,
    queue: Mutex<VecDeque<OutboundEntry>>,
    /// Exclusive "write currently in flight" flag.
    writing: AtomicBool,
    /// Idempotent open-to-closed transition.
    closed: AtomicBool,
    /// Deferred close requested; honored once the queue drains.
    closing: AtomicBool,
    /// Wakes the read loop when the connection is closed locally.
    shutdown: Notify,
}

impl<S> Shared<S> {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<OutboundEntry>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Flip the closed flag; returns `true` for the caller that performed
    /// the transition.
    fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shutdown.notify_one();
        true
    }
}

/// Cloneable outbound handle to one connection.
pub struct Transport<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for Transport<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Read side of one connection; drives the session until close.
pub struct Connection<S> {
    reader: ReadHalf<S>,
    buffer: ByteCursor,
    transport: Transport<S>,
}

impl<S: AsyncRead + AsyncWrite + Send + 'static> Transport<S> {
    /// Split `stream` into a read-side [`Connection`] and an outbound
    /// handle.
    pub fn pair(stream: S) -> (Connection<S>, Self) {
        let (reader, writer) = tokio::io::split(stream);
        let transport = Self {
            shared: Arc::new(Shared {
                writer: AsyncMutex::new(writer),
                queue: Mutex::new(VecDeque::new()),
                writing: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                shutdown: Notify::new(),
            }),
        };
        let connection = Connection {
            reader,
            buffer: ByteCursor::with_capacity(READ_BLOCK_SIZE),
            transport: transport.clone(),
        };
        (connection, transport)
    }

    /// Number of payloads waiting in the outbound queue.
    pub fn pending_writes(&self) -> usize {
        self.shared.lock_queue().len()
    }

    fn start_write_driver(&self) {
        if self
            .shared
            .writing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let shared = self.shared.clone();
        tokio::spawn(drive_writes(shared));
    }
}

impl<S: AsyncRead + AsyncWrite + Send + 'static> PacketSink for Transport<S> {
    fn enqueue(&self, payload: Bytes) {
        if payload.is_empty() {
            return;
        }
        if self.shared.closed.load(Ordering::Acquire) {
            warn!("enqueue on closed transport, dropping payload");
            return;
        }
        self.shared
            .lock_queue()
            .push_back(OutboundEntry { payload, sent: 0 });
        self.start_write_driver();
    }

    fn close(&self) {
        if self.shared.mark_closed() {
            debug!("transport closed");
        }
    }

    fn close_after_flush(&self) {
        self.shared.closing.store(true, Ordering::Release);
        // Nothing in flight and nothing queued: close immediately.
        if !self.shared.writing.load(Ordering::Acquire) && self.shared.lock_queue().is_empty() {
            self.close();
        }
    }

    fn is_open(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire) && !self.shared.closing.load(Ordering::Acquire)
    }
}

/// Write-completion loop: transmits the head queue entry, advances its sent
/// cursor, releases it when fully sent, and honors a deferred close once
/// the queue empties. At most one instance runs at a time.
async fn drive_writes<S: AsyncRead + AsyncWrite + Send + 'static>(shared: Arc<Shared<S>>) {
    loop {
        if shared.closed.load(Ordering::Acquire) {
            shared.writing.store(false, Ordering::Release);
            return;
        }

        let chunk = shared.lock_queue().front().map(OutboundEntry::remaining);
        let Some(chunk) = chunk else {
            shared.writing.store(false, Ordering::Release);

            // An enqueue may have raced the flag clear; reclaim the flag
            // and keep draining if so.
            let refilled = !shared.lock_queue().is_empty();
            if refilled
                && shared
                    .writing
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                continue;
            }

            if !refilled && shared.closing.load(Ordering::Acquire) {
                shared.mark_closed();
            }
            return;
        };

        let written = {
            let mut writer = shared.writer.lock().await;
            writer.write(&chunk).await
        };

        match written {
            Ok(0) | Err(_) => {
                if let Err(error) = written {
                    warn!(%error, "write failed, closing transport");
                }
                shared.mark_closed();
                shared.writing.store(false, Ordering::Release);
                return;
            }
            Ok(n) => {
                trace!(bytes = n, "write completed");
                let mut queue = shared.lock_queue();
                if let Some(front) = queue.front_mut() {
                    front.sent += n;
                    if front.is_done() {
                        queue.pop_front();
                    }
                }
            }
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Send + 'static> Connection<S> {
    /// Outbound handle for this connection.
    pub fn transport(&self) -> Transport<S> {
        self.transport.clone()
    }

    /// Drive the receive loop until the connection closes, invoking the
    /// handler's data hook after each completed read. On exit the send half
    /// is shut down and the closure hook runs exactly once.
    pub async fn run<H: PacketHandler>(mut self, handler: &mut H) -> Result<()> {
        let result = self.read_loop(handler).await;

        self.transport.shared.mark_closed();
        {
            let mut writer = self.transport.shared.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        handler.on_close();

        result
    }

    async fn read_loop<H: PacketHandler>(&mut self, handler: &mut H) -> Result<()> {
        loop {
            if self.transport.shared.closed.load(Ordering::Acquire) {
                return Ok(());
            }

            // Keep the free region bounded: move unread bytes to the front
            // and guarantee one receive block of space.
            self.buffer.normalize();
            self.buffer.ensure_free_space(READ_BLOCK_SIZE);

            tokio::select! {
                _ = self.transport.shared.shutdown.notified() => return Ok(()),
                read = self.reader.read(self.buffer.free_space_mut()) => match read {
                    Ok(0) => {
                        debug!("peer shut down the connection");
                        self.transport.shared.mark_closed();
                        return Ok(());
                    }
                    Ok(n) => {
                        trace!(bytes = n, "read completed");
                        self.buffer.write_completed(n);
                        if let Err(error) = handler.on_data(&mut self.buffer) {
                            self.transport.shared.mark_closed();
                            return Err(error);
                        }
                    }
                    Err(error) => {
                        // A completion failing after a local close is the
                        // expected cancellation path, not an error.
                        if self.transport.shared.mark_closed() {
                            return Err(error.into());
                        }
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use std::time::Duration;

    struct CollectHandler {
        seen: Vec<u8>,
        closed: usize,
    }

    impl CollectHandler {
        fn new() -> Self {
            Self {
                seen: Vec::new(),
                closed: 0,
            }
        }
    }

    impl PacketHandler for CollectHandler {
        fn on_data(&mut self, buffer: &mut ByteCursor) -> Result<()> {
            self.seen.extend_from_slice(buffer.peek());
            let n = buffer.active_size();
            buffer.consume(n);
            Ok(())
        }

        fn on_close(&mut self) {
            self.closed += 1;
        }
    }

    #[tokio::test]
    async fn payloads_sent_in_enqueue_order() {
        let (local, remote) = tokio::io::duplex(64);
        let (connection, transport) = Transport::pair(local);

        let mut handler = CollectHandler::new();
        let run = tokio::spawn(async move {
            let mut handler = CollectHandler::new();
            let (remote_conn, _remote_tx) = Transport::pair(remote);
            let _ = remote_conn.run(&mut handler).await;
            handler.seen
        });

        transport.enqueue(Bytes::from_static(b"first"));
        transport.enqueue(Bytes::from_static(b"second"));
        transport.enqueue(Bytes::from_static(b"third"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        transport.close();

        let _ = connection.run(&mut handler).await;
        assert_eq!(handler.closed, 1);

        let seen = run.await.unwrap();
        assert_eq!(seen, b"firstsecondthird");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (local, _remote) = tokio::io::duplex(64);
        let (connection, transport) = Transport::pair(local);

        assert!(transport.is_open());
        transport.close();
        transport.close();
        assert!(!transport.is_open());

        let mut handler = CollectHandler::new();
        connection.run(&mut handler).await.unwrap();
        assert_eq!(handler.closed, 1);
    }

    #[tokio::test]
    async fn deferred_close_waits_for_queue_drain() {
        let (local, remote) = tokio::io::duplex(8);
        let (connection, transport) = Transport::pair(local);

        transport.enqueue(Bytes::from(vec![0x42u8; 64]));
        transport.close_after_flush();

        let reader = tokio::spawn(async move {
            let mut handler = CollectHandler::new();
            let (remote_conn, _remote_tx) = Transport::pair(remote);
            let _ = remote_conn.run(&mut handler).await;
            handler.seen
        });

        let mut handler = CollectHandler::new();
        connection.run(&mut handler).await.unwrap();
        assert_eq!(handler.closed, 1);

        // All 64 bytes drained through the 8-byte pipe before the close.
        let seen = reader.await.unwrap();
        assert_eq!(seen.len(), 64);
    }

    #[tokio::test]
    async fn handler_error_closes_connection() {
        struct FailingHandler;
        impl PacketHandler for FailingHandler {
            fn on_data(&mut self, buffer: &mut ByteCursor) -> Result<()> {
                let n = buffer.active_size();
                buffer.consume(n);
                Err(AuthError::MalformedPacket("test"))
            }
        }

        let (local, remote) = tokio::io::duplex(64);
        let (connection, _transport) = Transport::pair(local);
        let (_remote_conn, remote_tx) = Transport::pair(remote);

        remote_tx.enqueue(Bytes::from_static(b"garbage"));

        let mut handler = FailingHandler;
        let result = connection.run(&mut handler).await;
        assert!(matches!(result, Err(AuthError::MalformedPacket(_))));
    }
}
