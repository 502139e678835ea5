//! Accumulating reader over independently-sized input chunks.

use std::collections::VecDeque;

/// A reader that accumulates byte chunks and reads across their
/// boundaries without merging them.
///
/// Consuming reads assume the caller has already verified availability
/// via [`size`](ChunkReader::size); reading past the buffered bytes is
/// a bug in the caller and panics. [`peek_at`](ChunkReader::peek_at)
/// never consumes, which lets a decoder size up a whole token header
/// before committing to read it.
pub struct ChunkReader {
    chunks: VecDeque<Vec<u8>>,
    /// Read position within the front chunk.
    x: usize,
    /// Unread bytes across all chunks.
    total: usize,
    /// Absolute offset of the next unread byte.
    consumed: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            x: 0,
            total: 0,
            consumed: 0,
        }
    }

    /// Appends a chunk of input.
    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.total += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Number of bytes available to read.
    pub fn size(&self) -> usize {
        self.total
    }

    /// Absolute offset of the next unread byte in the logical
    /// concatenation of all pushed chunks.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Returns the byte `offset` positions ahead of the cursor, or
    /// `None` if that byte has not arrived yet.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        if offset >= self.total {
            return None;
        }
        let mut pos = self.x + offset;
        for chunk in &self.chunks {
            if pos < chunk.len() {
                return Some(chunk[pos]);
            }
            pos -= chunk.len();
        }
        None
    }

    fn assert_size(&self, size: usize) {
        if size > self.total {
            panic!("OUT_OF_BOUNDS");
        }
    }

    /// Reads a single byte.
    pub fn u8(&mut self) -> u8 {
        self.assert_size(1);
        let octet = self.chunks[0][self.x];
        self.x += 1;
        self.total -= 1;
        self.consumed += 1;
        if self.x >= self.chunks[0].len() {
            self.chunks.pop_front();
            self.x = 0;
        }
        octet
    }

    /// Reads an unsigned 16-bit integer (big-endian).
    pub fn u16(&mut self) -> u16 {
        ((self.u8() as u16) << 8) | self.u8() as u16
    }

    /// Reads an unsigned 32-bit integer (big-endian).
    pub fn u32(&mut self) -> u32 {
        ((self.u16() as u32) << 16) | self.u16() as u32
    }

    /// Reads an unsigned 64-bit integer (big-endian).
    pub fn u64(&mut self) -> u64 {
        ((self.u32() as u64) << 32) | self.u32() as u64
    }

    /// Reads `size` bytes into a new vector.
    pub fn buf(&mut self, size: usize) -> Vec<u8> {
        self.assert_size(size);
        let mut out = Vec::with_capacity(size);
        let mut remaining = size;
        while remaining > 0 {
            let available = self.chunks[0].len() - self.x;
            let take = available.min(remaining);
            out.extend_from_slice(&self.chunks[0][self.x..self.x + take]);
            remaining -= take;
            self.x += take;
            if self.x >= self.chunks[0].len() {
                self.chunks.pop_front();
                self.x = 0;
            }
        }
        self.total -= size;
        self.consumed += size;
        out
    }

    /// Skips `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) {
        self.assert_size(n);
        let mut remaining = n;
        while remaining > 0 {
            let available = self.chunks[0].len() - self.x;
            if available > remaining {
                self.x += remaining;
                break;
            }
            remaining -= available;
            self.chunks.pop_front();
            self.x = 0;
        }
        self.total -= n;
        self.consumed += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_across_chunks() {
        let mut reader = ChunkReader::new();
        reader.push(vec![1, 2]);
        reader.push(vec![3, 4]);
        assert_eq!(reader.u8(), 1);
        assert_eq!(reader.u8(), 2);
        assert_eq!(reader.u8(), 3);
        assert_eq!(reader.u8(), 4);
        assert_eq!(reader.size(), 0);
    }

    #[test]
    fn test_u32_across_chunks() {
        let mut reader = ChunkReader::new();
        reader.push(vec![0x01]);
        reader.push(vec![0x02, 0x03]);
        reader.push(vec![0x04]);
        assert_eq!(reader.u32(), 0x01020304);
    }

    #[test]
    fn test_peek_at_does_not_consume() {
        let mut reader = ChunkReader::new();
        reader.push(vec![10, 11]);
        reader.push(vec![12]);
        assert_eq!(reader.peek_at(0), Some(10));
        assert_eq!(reader.peek_at(2), Some(12));
        assert_eq!(reader.peek_at(3), None);
        assert_eq!(reader.u8(), 10);
        assert_eq!(reader.peek_at(1), Some(12));
    }

    #[test]
    fn test_buf_spans_chunks() {
        let mut reader = ChunkReader::new();
        reader.push(vec![1, 2, 3]);
        reader.push(vec![4, 5]);
        assert_eq!(reader.buf(4), vec![1, 2, 3, 4]);
        assert_eq!(reader.u8(), 5);
    }

    #[test]
    fn test_consumed_offset() {
        let mut reader = ChunkReader::new();
        reader.push(vec![1, 2, 3, 4, 5]);
        reader.skip(2);
        assert_eq!(reader.consumed(), 2);
        reader.buf(2);
        assert_eq!(reader.consumed(), 4);
        reader.push(vec![6]);
        assert_eq!(reader.size(), 2);
    }

    #[test]
    fn test_empty_chunks_ignored() {
        let mut reader = ChunkReader::new();
        reader.push(Vec::new());
        reader.push(vec![7]);
        assert_eq!(reader.size(), 1);
        assert_eq!(reader.u8(), 7);
    }
}
