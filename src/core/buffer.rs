//! # Byte Cursor
//!
//! A growable byte buffer with independent read and write cursors.
//!
//! The transport reads socket data into the free region behind the write
//! cursor; the codec inspects the active region between the two cursors
//! without consuming it, and only advances the read cursor once a complete
//! frame has been decoded. Outbound frames are built with the typed `put_*`
//! appenders.
//!
//! `normalize` moves unread bytes to the front so the free region never
//! needs unbounded growth under a steady low-duplex workload.

/// Default receive block size; also the minimum free region guaranteed
/// before each socket read.
pub const READ_BLOCK_SIZE: usize = 4096;

/// Resizable byte buffer with sequential read/write cursors.
#[derive(Debug, Clone, Default)]
pub struct ByteCursor {
    storage: Vec<u8>,
    rpos: usize,
    wpos: usize,
}

impl ByteCursor {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with `capacity` bytes of zeroed storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity],
            rpos: 0,
            wpos: 0,
        }
    }

    /// Number of unread bytes between the read and write cursors.
    pub fn active_size(&self) -> usize {
        self.wpos - self.rpos
    }

    /// Number of writable bytes behind the write cursor.
    pub fn remaining_space(&self) -> usize {
        self.storage.len() - self.wpos
    }

    /// Borrow the active (unread) region without consuming it.
    pub fn peek(&self) -> &[u8] {
        &self.storage[self.rpos..self.wpos]
    }

    /// Borrow `len` bytes at `offset` into the active region, if present.
    pub fn peek_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let start = self.rpos.checked_add(offset)?;
        let end = start.checked_add(len)?;
        if end > self.wpos {
            return None;
        }
        Some(&self.storage[start..end])
    }

    /// Consume `n` leading bytes of the active region.
    ///
    /// # Panics
    /// Panics if `n` exceeds the active size; the codec only ever consumes
    /// lengths it has already verified complete.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.active_size(), "consume past write cursor");
        self.rpos += n;
    }

    /// Record that `n` bytes were written into the free region.
    pub fn write_completed(&mut self, n: usize) {
        debug_assert!(n <= self.remaining_space());
        self.wpos += n;
    }

    /// Mutable view of the free region for the transport to read into.
    pub fn free_space_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.wpos..]
    }

    /// Move unread bytes to the front of the storage.
    pub fn normalize(&mut self) {
        if self.rpos == 0 {
            return;
        }
        self.storage.copy_within(self.rpos..self.wpos, 0);
        self.wpos -= self.rpos;
        self.rpos = 0;
    }

    /// Grow the storage so at least `min` writable bytes are available.
    pub fn ensure_free_space(&mut self, min: usize) {
        if self.remaining_space() < min {
            self.storage.resize(self.wpos + min, 0);
        }
    }

    /// Bytes written so far, from the start of the storage.
    pub fn written(&self) -> &[u8] {
        &self.storage[..self.wpos]
    }

    fn reserve_append(&mut self, len: usize) -> &mut [u8] {
        self.ensure_free_space(len);
        let start = self.wpos;
        self.wpos += len;
        &mut self.storage[start..start + len]
    }

    /// Append raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.reserve_append(bytes.len()).copy_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn put_u8(&mut self, value: u8) {
        self.put_bytes(&[value]);
    }

    /// Append a little-endian u16.
    pub fn put_u16_le(&mut self, value: u16) {
        self.put_bytes(&value.to_le_bytes());
    }

    /// Append a little-endian u32.
    pub fn put_u32_le(&mut self, value: u32) {
        self.put_bytes(&value.to_le_bytes());
    }

    /// Append a string followed by a NUL terminator.
    pub fn put_cstr(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
        self.put_u8(0);
    }

    /// Append string bytes without a terminator.
    pub fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }
}
