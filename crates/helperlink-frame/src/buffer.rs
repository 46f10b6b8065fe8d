use tracing::trace;

use crate::error::{FrameError, Result};

/// Fixed-capacity byte store with a consumed-prefix/used-suffix window.
///
/// ```text
/// 0          start            end              capacity
/// ├──────────┼────────────────┼────────────────┤
/// │ consumed │ live (len)     │ free (avail)   │
/// └──────────┴────────────────┴────────────────┘
/// ```
///
/// Producers write into [`spare_mut`](Self::spare_mut) and commit with
/// [`mark_used`](Self::mark_used); consumers read [`filled`](Self::filled)
/// and release with [`mark_unused`](Self::mark_unused). The buffer never
/// grows: running out of space is reported, not absorbed.
pub struct FramedBuffer {
    data: Box<[u8]>,
    start: usize,
    end: usize,
}

impl FramedBuffer {
    /// Capacity used by login helper channels unless configured otherwise.
    pub const DEFAULT_CAPACITY: usize = 8 * 1024;

    /// Create an empty buffer with [`DEFAULT_CAPACITY`](Self::DEFAULT_CAPACITY).
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
        }
    }

    /// Drop all buffered bytes and rewind both cursors.
    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Contiguous free space at the tail, usable without compaction.
    pub fn avail(&self) -> usize {
        self.data.len() - self.end
    }

    /// Consumed space before `start` that compaction would reclaim.
    pub fn avail_head(&self) -> usize {
        self.start
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The unconsumed bytes, `[start, end)`.
    pub fn filled(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    /// The free tail region, `[end, capacity)`.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.end..]
    }

    /// Commit `n` bytes just written into the tail region.
    ///
    /// # Panics
    /// If `n > avail()`.
    pub fn mark_used(&mut self, n: usize) {
        assert!(
            n <= self.avail(),
            "mark_used({n}) exceeds free tail space ({})",
            self.avail()
        );
        self.end += n;
    }

    /// Release `n` bytes from the head.
    ///
    /// # Panics
    /// If `n > len()`.
    pub fn mark_unused(&mut self, n: usize) {
        assert!(
            n <= self.len(),
            "mark_unused({n}) exceeds buffered length ({})",
            self.len()
        );
        self.start += n;
    }

    /// Opportunistic compaction.
    ///
    /// A drained buffer is rewound. Live bytes are only moved when the tail
    /// has less free space than the head would give back.
    pub fn reorganize(&mut self) {
        if self.start == self.end {
            self.clear();
            return;
        }

        if self.avail() >= self.avail_head() {
            return;
        }

        self.compact();
    }

    /// Ensure at least `n` free bytes at the tail, compacting if needed.
    pub fn make_space(&mut self, n: usize) -> Result<()> {
        if self.avail() < n {
            self.compact();

            if self.avail() < n {
                return Err(FrameError::BufferFull {
                    requested: n,
                    free: self.avail(),
                    capacity: self.capacity(),
                });
            }
        }
        Ok(())
    }

    /// Append `bytes` at the tail, compacting if needed.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        self.make_space(bytes.len())?;
        self.spare_mut()[..bytes.len()].copy_from_slice(bytes);
        self.mark_used(bytes.len());
        Ok(())
    }

    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }

        let len = self.len();
        trace!(offset = self.start, moved = len, "compacting frame buffer");
        self.data.copy_within(self.start..self.end, 0);
        self.start = 0;
        self.end = len;
    }
}

impl Default for FramedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FramedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedBuffer")
            .field("capacity", &self.capacity())
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_with(capacity: usize, bytes: &[u8]) -> FramedBuffer {
        let mut buf = FramedBuffer::with_capacity(capacity);
        buf.extend_from_slice(bytes).unwrap();
        buf
    }

    fn assert_invariant(buf: &FramedBuffer) {
        assert!(buf.start() <= buf.end());
        assert!(buf.end() <= buf.capacity());
        assert!(buf.len() <= buf.capacity());
        assert_eq!(buf.avail(), buf.capacity() - buf.end());
    }

    #[test]
    fn new_buffer_is_empty() {
        let buf = FramedBuffer::new();
        assert_eq!(buf.capacity(), 8192);
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.avail(), 8192);
        assert_eq!(buf.avail_head(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn mark_used_and_unused_move_cursors() {
        let mut buf = FramedBuffer::with_capacity(16);
        buf.spare_mut()[..5].copy_from_slice(b"hello");
        buf.mark_used(5);
        assert_eq!(buf.filled(), b"hello");
        assert_eq!(buf.avail(), 11);

        buf.mark_unused(2);
        assert_eq!(buf.filled(), b"llo");
        assert_eq!(buf.start(), 2);
        assert_eq!(buf.end(), 5);
        assert_invariant(&buf);
    }

    #[test]
    fn clear_rewinds_cursors() {
        let mut buf = filled_with(16, b"abcdef");
        buf.mark_unused(3);
        buf.clear();
        assert_eq!((buf.start(), buf.end()), (0, 0));
    }

    #[test]
    #[should_panic(expected = "exceeds free tail space")]
    fn mark_used_past_capacity_panics() {
        let mut buf = FramedBuffer::with_capacity(4);
        buf.mark_used(5);
    }

    #[test]
    #[should_panic(expected = "exceeds buffered length")]
    fn mark_unused_past_len_panics() {
        let mut buf = filled_with(8, b"ab");
        buf.mark_unused(3);
    }

    #[test]
    fn reorganize_resets_drained_buffer() {
        let mut buf = filled_with(16, b"abcdef");
        buf.mark_unused(6);
        buf.reorganize();
        assert_eq!((buf.start(), buf.end()), (0, 0));
        assert_eq!(buf.avail(), 16);
    }

    #[test]
    fn reorganize_skips_when_tail_has_enough_room() {
        let mut buf = filled_with(16, b"abcdef");
        buf.mark_unused(2);
        // tail free = 10, head reclaimable = 2
        buf.reorganize();
        assert_eq!((buf.start(), buf.end()), (2, 6));
        assert_eq!(buf.filled(), b"cdef");
    }

    #[test]
    fn reorganize_compacts_when_head_exceeds_tail() {
        let mut buf = filled_with(16, b"0123456789abcd");
        buf.mark_unused(10);
        // tail free = 2, head reclaimable = 10
        buf.reorganize();
        assert_eq!((buf.start(), buf.end()), (0, 4));
        assert_eq!(buf.filled(), b"abcd");
        assert_invariant(&buf);
    }

    #[test]
    fn make_space_without_compaction() {
        let mut buf = filled_with(16, b"abcd");
        buf.mark_unused(2);
        buf.make_space(12).unwrap();
        assert_eq!((buf.start(), buf.end()), (2, 4));
    }

    #[test]
    fn make_space_forces_compaction() {
        let mut buf = filled_with(16, b"0123456789abcd");
        buf.mark_unused(3);
        // tail free = 2 but head has 3 reclaimable; the heuristic alone would not move.
        buf.make_space(5).unwrap();
        assert_eq!(buf.start(), 0);
        assert_eq!(buf.filled(), b"3456789abcd");
        assert!(buf.avail() >= 5);
    }

    #[test]
    fn make_space_fails_when_capacity_is_insufficient() {
        let mut buf = filled_with(16, b"0123456789");
        buf.mark_unused(2);
        let err = buf.make_space(9).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferFull {
                requested: 9,
                free: 8,
                capacity: 16
            }
        ));
        // the compaction already performed is kept
        assert_eq!(buf.start(), 0);
        assert_eq!(buf.filled(), b"23456789");
    }

    #[test]
    fn make_space_succeeds_iff_len_plus_n_fits() {
        for consumed in 0..=10usize {
            for n in 0..=20usize {
                let mut buf = filled_with(16, b"0123456789");
                buf.mark_unused(consumed);
                let len = buf.len();
                let result = buf.make_space(n);
                assert_eq!(result.is_ok(), len + n <= 16, "consumed={consumed} n={n}");
                if result.is_ok() {
                    assert!(buf.avail() >= n);
                }
                assert_invariant(&buf);
            }
        }
    }

    #[test]
    fn compaction_preserves_content() {
        let mut buf = FramedBuffer::with_capacity(32);
        let mut expected = Vec::new();
        let mut next = 0u8;

        for step in 0..200usize {
            let write = (step * 7) % 11;
            if buf.make_space(write).is_ok() {
                let chunk: Vec<u8> = (0..write)
                    .map(|_| {
                        next = next.wrapping_add(1);
                        next
                    })
                    .collect();
                buf.spare_mut()[..write].copy_from_slice(&chunk);
                buf.mark_used(write);
                expected.extend_from_slice(&chunk);
            }

            let consume = ((step * 5) % 9).min(buf.len());
            buf.mark_unused(consume);
            expected.drain(..consume);

            let before_start = buf.start();
            buf.reorganize();
            if !buf.is_empty() && buf.start() != before_start {
                assert_eq!(buf.start(), 0);
            }

            assert_eq!(buf.filled(), expected.as_slice());
            assert_invariant(&buf);
        }
    }
}
