//! Owned frame buffer with front headroom.
//!
//! Valid bytes live in `storage[offset..]`. Consuming from the front only
//! advances `offset`; the freed space becomes headroom that a later
//! [`FrameBuf::prepend`] can write a header into without moving the payload.
//!
//! ```text
//! storage: [ headroom .......... | valid bytes ............ ]
//!            0                 offset                   len()
//! ```

use heapless::Vec;

use crate::error::LinkError;

/// Hard upper bound on any single frame or reassembled message.
pub const FRAME_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuf {
    storage: Vec<u8, FRAME_CAPACITY>,
    offset: usize,
    /// Soft capacity, `<= FRAME_CAPACITY`.
    limit: usize,
}

impl FrameBuf {
    pub fn new() -> Self {
        Self::with_limit(FRAME_CAPACITY)
    }

    /// Buffer that refuses to grow past `limit` bytes (headroom included).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            storage: Vec::new(),
            offset: 0,
            limit: limit.min(FRAME_CAPACITY),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, LinkError> {
        let mut buf = Self::new();
        buf.extend_from_slice(bytes)?;
        Ok(buf)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..]
    }

    pub fn len(&self) -> usize {
        self.storage.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes available in front of the valid region.
    pub fn headroom(&self) -> usize {
        self.offset
    }

    /// Bytes that can still be appended.
    pub fn spare(&self) -> usize {
        self.limit - self.storage.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.storage.clear();
        self.offset = 0;
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if bytes.len() > self.spare() {
            return Err(LinkError::Oversize);
        }
        self.storage
            .extend_from_slice(bytes)
            .map_err(|()| LinkError::Oversize)
    }

    /// Grow by `n` zeroed bytes and hand them out for filling in place.
    ///
    /// Pair with [`truncate`](Self::truncate) when fewer bytes arrive.
    pub fn extend_zeroed(&mut self, n: usize) -> Result<&mut [u8], LinkError> {
        if n > self.spare() {
            return Err(LinkError::Oversize);
        }
        let start = self.storage.len();
        self.storage
            .resize(start + n, 0)
            .map_err(|()| LinkError::Oversize)?;
        Ok(&mut self.storage[start..])
    }

    /// Keep only the first `len` valid bytes.
    pub fn truncate(&mut self, len: usize) {
        self.storage.truncate(self.offset + len);
    }

    /// Drop `n` bytes from the front, turning them into headroom.
    pub fn consume_front(&mut self, n: usize) {
        self.offset += n.min(self.len());
    }

    /// Make sure at least `n` bytes of headroom exist, shifting the valid
    /// bytes back if needed.
    pub fn reserve_front(&mut self, n: usize) -> Result<(), LinkError> {
        if self.offset >= n {
            return Ok(());
        }
        let shift = n - self.offset;
        if shift > self.spare() {
            return Err(LinkError::Oversize);
        }
        let old_len = self.storage.len();
        self.storage
            .resize(old_len + shift, 0)
            .map_err(|()| LinkError::Oversize)?;
        self.storage.copy_within(self.offset..old_len, n);
        self.offset = n;
        Ok(())
    }

    /// Write `bytes` immediately in front of the valid region.
    pub fn prepend(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.reserve_front(bytes.len())?;
        self.offset -= bytes.len();
        let start = self.offset;
        self.storage[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

impl Default for FrameBuf {
    fn default() -> Self {
        Self::new()
    }
}
