//! Chunk-batching binary writer.

/// Default size of an output chunk, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A binary writer that batches output into fixed-size chunks.
///
/// Writes land in one active chunk. When a write would cross the chunk
/// boundary the active chunk is pushed onto the full-chunk queue and a
/// fresh one is allocated; a single write larger than the chunk size
/// gets a dedicated one-off chunk so it is never fragmented. At most
/// one partial chunk exists at any time.
///
/// # Example
///
/// ```
/// use mpack_buffers::ChunkWriter;
///
/// let mut writer = ChunkWriter::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// assert_eq!(writer.flush(), [0x01, 0x02, 0x03]);
/// ```
pub struct ChunkWriter {
    /// The active output chunk.
    pub buf: Vec<u8>,
    /// Write cursor within the active chunk.
    pub x: usize,
    chunk_size: usize,
    full: Vec<Vec<u8>>,
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkWriter {
    /// Creates a writer with the default chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates a writer with a custom chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            buf: vec![0u8; chunk_size],
            x: 0,
            chunk_size,
            full: Vec::new(),
        }
    }

    /// Number of bytes buffered but not yet collected.
    pub fn written(&self) -> usize {
        self.full.iter().map(Vec::len).sum::<usize>() + self.x
    }

    /// Ensures the active chunk has room for `n` more bytes.
    ///
    /// Rotates the active chunk into the full queue when the write
    /// would cross its boundary. Oversized requests allocate a
    /// dedicated chunk of exactly `n` bytes.
    pub fn reserve(&mut self, n: usize) {
        if self.x + n <= self.buf.len() {
            return;
        }
        self.rotate();
        if n > self.chunk_size {
            self.buf = vec![0u8; n];
        }
    }

    fn rotate(&mut self) {
        if self.x > 0 {
            let mut chunk = std::mem::replace(&mut self.buf, vec![0u8; self.chunk_size]);
            chunk.truncate(self.x);
            self.full.push(chunk);
            self.x = 0;
        } else if self.buf.len() != self.chunk_size {
            // Discard an unused one-off buffer.
            self.buf = vec![0u8; self.chunk_size];
        }
    }

    /// Discards all buffered state.
    pub fn reset(&mut self) {
        self.full.clear();
        self.x = 0;
        if self.buf.len() != self.chunk_size {
            self.buf = vec![0u8; self.chunk_size];
        }
    }

    /// Returns every byte written so far as one contiguous buffer.
    pub fn flush(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.written());
        for chunk in self.full.drain(..) {
            out.extend_from_slice(&chunk);
        }
        out.extend_from_slice(&self.buf[..self.x]);
        self.x = 0;
        out
    }

    /// Returns the buffered output as the sequence of chunks it was
    /// batched into, the trailing partial chunk last.
    pub fn flush_chunks(&mut self) -> Vec<Vec<u8>> {
        let mut out = std::mem::take(&mut self.full);
        if self.x > 0 {
            let mut tail = std::mem::replace(&mut self.buf, vec![0u8; self.chunk_size]);
            tail.truncate(self.x);
            out.push(tail);
            self.x = 0;
        }
        out
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.reserve(1);
        self.buf[self.x] = val;
        self.x += 1;
    }

    /// Writes an unsigned 16-bit integer (big-endian).
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.reserve(2);
        self.buf[self.x..self.x + 2].copy_from_slice(&val.to_be_bytes());
        self.x += 2;
    }

    /// Writes an unsigned 32-bit integer (big-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.reserve(4);
        self.buf[self.x..self.x + 4].copy_from_slice(&val.to_be_bytes());
        self.x += 4;
    }

    /// Writes a u8 followed by a u8.
    pub fn u8u8(&mut self, a: u8, b: u8) {
        self.reserve(2);
        self.buf[self.x] = a;
        self.buf[self.x + 1] = b;
        self.x += 2;
    }

    /// Writes a u8 followed by a u16 (big-endian).
    pub fn u8u16(&mut self, a: u8, val: u16) {
        self.reserve(3);
        self.buf[self.x] = a;
        self.buf[self.x + 1..self.x + 3].copy_from_slice(&val.to_be_bytes());
        self.x += 3;
    }

    /// Writes a u8 followed by a u32 (big-endian).
    pub fn u8u32(&mut self, a: u8, val: u32) {
        self.reserve(5);
        self.buf[self.x] = a;
        self.buf[self.x + 1..self.x + 5].copy_from_slice(&val.to_be_bytes());
        self.x += 5;
    }

    /// Writes a u8 followed by a u64 (big-endian).
    pub fn u8u64(&mut self, a: u8, val: u64) {
        self.reserve(9);
        self.buf[self.x] = a;
        self.buf[self.x + 1..self.x + 9].copy_from_slice(&val.to_be_bytes());
        self.x += 9;
    }

    /// Writes a u8 followed by an f64 (big-endian IEEE 754).
    pub fn u8f64(&mut self, a: u8, val: f64) {
        self.reserve(9);
        self.buf[self.x] = a;
        self.buf[self.x + 1..self.x + 9].copy_from_slice(&val.to_be_bytes());
        self.x += 9;
    }

    /// Writes a byte slice.
    ///
    /// Slices at least one chunk long bypass the active chunk and are
    /// queued as a dedicated chunk, preserving write order.
    pub fn bytes(&mut self, data: &[u8]) {
        if data.len() >= self.chunk_size {
            self.rotate();
            self.full.push(data.to_vec());
            return;
        }
        self.reserve(data.len());
        self.buf[self.x..self.x + data.len()].copy_from_slice(data);
        self.x += data.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let mut writer = ChunkWriter::new();
        writer.u8(0x01);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_u16() {
        let mut writer = ChunkWriter::new();
        writer.u16(0x0102);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_u8u32() {
        let mut writer = ChunkWriter::new();
        writer.u8u32(0xdb, 0x01020304);
        assert_eq!(writer.flush(), [0xdb, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_flush_resets() {
        let mut writer = ChunkWriter::new();
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x02]);
    }

    #[test]
    fn test_chunk_rotation() {
        let mut writer = ChunkWriter::with_chunk_size(4);
        for i in 0..6u8 {
            writer.u8(i);
        }
        let chunks = writer.flush_chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], [0, 1, 2, 3]);
        assert_eq!(chunks[1], [4, 5]);
    }

    #[test]
    fn test_oversized_write_gets_dedicated_chunk() {
        let mut writer = ChunkWriter::with_chunk_size(4);
        writer.u8(0xaa);
        writer.bytes(&[1, 2, 3, 4, 5, 6]);
        let chunks = writer.flush_chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], [0xaa]);
        assert_eq!(chunks[1], [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_reserve_keeps_write_contiguous() {
        let mut writer = ChunkWriter::with_chunk_size(4);
        writer.u8(0x01);
        writer.u8(0x02);
        // A 3-byte write no longer fits, so it rotates whole.
        writer.u8u16(0xcd, 0x0304);
        let chunks = writer.flush_chunks();
        assert_eq!(chunks[0], [0x01, 0x02]);
        assert_eq!(chunks[1], [0xcd, 0x03, 0x04]);
    }

    #[test]
    fn test_written() {
        let mut writer = ChunkWriter::with_chunk_size(4);
        for i in 0..6u8 {
            writer.u8(i);
        }
        assert_eq!(writer.written(), 6);
        writer.flush();
        assert_eq!(writer.written(), 0);
    }
}
