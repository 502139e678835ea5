//! Streaming front ends over [`Encoder`] and [`Decoder`].
//!
//! Both are thin adapters: each `write` call hands back everything the
//! underlying codec produced for that input, preserving order.

use std::sync::Arc;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::CodecError;
use crate::ext::ExtCodec;
use crate::value::MsgValue;

/// Encodes a sequence of values into a stream of byte chunks.
pub struct EncodeStream {
    encoder: Encoder,
}

impl Default for EncodeStream {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeStream {
    pub fn new() -> Self {
        Self {
            encoder: Encoder::new(),
        }
    }

    pub fn with_codec(codec: Arc<ExtCodec>) -> Self {
        Self {
            encoder: Encoder::with_codec(codec),
        }
    }

    /// Encodes one value, returning its output chunks in order.
    pub fn write(&mut self, value: &MsgValue) -> Result<Vec<Vec<u8>>, CodecError> {
        let mut chunks = Vec::new();
        self.encoder.encode_to(value, &mut |chunk| chunks.push(chunk))?;
        Ok(chunks)
    }
}

/// Decodes a stream of byte chunks into a sequence of values.
///
/// Chunk boundaries are arbitrary; values completed by a chunk are
/// returned from that `write` call, partial state carries over.
pub struct DecodeStream {
    decoder: Decoder,
}

impl Default for DecodeStream {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeStream {
    pub fn new() -> Self {
        Self {
            decoder: Decoder::new(),
        }
    }

    pub fn with_codec(codec: Arc<ExtCodec>) -> Self {
        Self {
            decoder: Decoder::with_codec(codec),
        }
    }

    /// Feeds one chunk, returning every value it completed.
    pub fn write(&mut self, chunk: &[u8]) -> Result<Vec<MsgValue>, CodecError> {
        self.decoder.push(chunk)?;
        let mut values = Vec::new();
        while let Some(value) = self.decoder.read() {
            values.push(value);
        }
        Ok(values)
    }

    /// True while a value is partially decoded.
    pub fn in_progress(&self) -> bool {
        self.decoder.in_progress()
    }
}
