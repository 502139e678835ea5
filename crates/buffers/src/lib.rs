//! Chunked byte buffer primitives for the mpack codec.
//!
//! [`ChunkWriter`] batches encoder output into fixed-size chunks;
//! [`ChunkReader`] accumulates decoder input arriving in arbitrary
//! chunks and supports non-consuming lookahead across chunk
//! boundaries.

mod reader;
mod writer;

pub use reader::ChunkReader;
pub use writer::{ChunkWriter, DEFAULT_CHUNK_SIZE};
