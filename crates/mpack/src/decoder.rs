//! Incremental MessagePack decoder.
//!
//! Bytes arrive in arbitrarily split chunks via [`Decoder::push`];
//! completed top-level values queue up for [`Decoder::read`]. A token
//! is consumed only once its header and payload are fully buffered, so
//! a chunk boundary can land anywhere, including inside a multi-byte
//! header, without losing state.

use std::collections::VecDeque;
use std::sync::Arc;

use mpack_buffers::ChunkReader;

use crate::cesu8;
use crate::error::CodecError;
use crate::ext::{default_codec, ExtCodec};
use crate::value::MsgValue;

enum Frame {
    Array {
        remaining: usize,
        items: Vec<MsgValue>,
    },
    Map {
        remaining: usize,
        pending_key: Option<String>,
        items: Vec<(String, MsgValue)>,
    },
}

enum Step {
    /// Not enough buffered bytes for the next token; wait for more.
    Suspend,
    /// A complete scalar or payload-bearing value.
    Value(MsgValue),
    /// A container header opened a new frame.
    Opened,
}

pub struct Decoder {
    reader: ChunkReader,
    stack: Vec<Frame>,
    out: VecDeque<MsgValue>,
    codec: Arc<ExtCodec>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Creates a decoder using the process-wide default registry.
    pub fn new() -> Self {
        Self::with_codec(default_codec())
    }

    /// Creates a decoder using the given registry.
    pub fn with_codec(codec: Arc<ExtCodec>) -> Self {
        Self {
            reader: ChunkReader::new(),
            stack: Vec::new(),
            out: VecDeque::new(),
            codec,
        }
    }

    /// Feeds a chunk and decodes as far as the buffered bytes allow.
    ///
    /// An error is terminal for the feed that raised it; the decoder
    /// does not attempt to resynchronize.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), CodecError> {
        self.reader.push(chunk.to_vec());
        loop {
            match self.next_token()? {
                Step::Suspend => return Ok(()),
                Step::Value(value) => self.complete(value)?,
                Step::Opened => {}
            }
        }
    }

    /// Takes the next completed top-level value, in decode order.
    pub fn read(&mut self) -> Option<MsgValue> {
        self.out.pop_front()
    }

    /// True while a value is partially decoded or bytes are buffered.
    pub fn in_progress(&self) -> bool {
        !self.stack.is_empty() || self.reader.size() > 0
    }

    fn next_token(&mut self) -> Result<Step, CodecError> {
        let Some(tag) = self.reader.peek_at(0) else {
            return Ok(Step::Suspend);
        };
        match tag {
            0x00..=0x7f => {
                self.reader.skip(1);
                Ok(Step::Value(MsgValue::Int(tag as i64)))
            }
            0xe0..=0xff => {
                self.reader.skip(1);
                Ok(Step::Value(MsgValue::Int(tag as i8 as i64)))
            }
            0x80..=0x8f => {
                self.reader.skip(1);
                Ok(self.open_map((tag & 0x0f) as usize))
            }
            0x90..=0x9f => {
                self.reader.skip(1);
                Ok(self.open_arr((tag & 0x0f) as usize))
            }
            0xa0..=0xbf => self.read_str(1, (tag & 0x1f) as usize),
            0xc0 => {
                self.reader.skip(1);
                Ok(Step::Value(MsgValue::Nil))
            }
            0xc1 => Err(CodecError::InvalidFormat {
                byte: tag,
                offset: self.reader.consumed(),
            }),
            0xc2 => {
                self.reader.skip(1);
                Ok(Step::Value(MsgValue::Bool(false)))
            }
            0xc3 => {
                self.reader.skip(1);
                Ok(Step::Value(MsgValue::Bool(true)))
            }
            0xc4 => match self.reader.peek_at(1) {
                Some(len) => self.read_bin(2, len as usize),
                None => Ok(Step::Suspend),
            },
            0xc5 => match self.peek_u16(1) {
                Some(len) => self.read_bin(3, len as usize),
                None => Ok(Step::Suspend),
            },
            0xc6 => match self.peek_u32(1) {
                Some(len) => self.read_bin(5, len as usize),
                None => Ok(Step::Suspend),
            },
            0xc7 => match self.reader.peek_at(1) {
                Some(len) => self.read_ext(2, len as usize),
                None => Ok(Step::Suspend),
            },
            0xc8 => match self.peek_u16(1) {
                Some(len) => self.read_ext(3, len as usize),
                None => Ok(Step::Suspend),
            },
            0xc9 => match self.peek_u32(1) {
                Some(len) => self.read_ext(5, len as usize),
                None => Ok(Step::Suspend),
            },
            0xca => {
                if self.reader.size() < 5 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let bits = self.reader.u32();
                Ok(Step::Value(MsgValue::Float(f32::from_bits(bits) as f64)))
            }
            0xcb => {
                if self.reader.size() < 9 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let bits = self.reader.u64();
                Ok(Step::Value(MsgValue::Float(f64::from_bits(bits))))
            }
            0xcc => {
                if self.reader.size() < 2 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u8();
                Ok(Step::Value(MsgValue::Int(v as i64)))
            }
            0xcd => {
                if self.reader.size() < 3 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u16();
                Ok(Step::Value(MsgValue::Int(v as i64)))
            }
            0xce => {
                if self.reader.size() < 5 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u32();
                Ok(Step::Value(MsgValue::Int(v as i64)))
            }
            0xcf => {
                if self.reader.size() < 9 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u64();
                Ok(Step::Value(if v <= i64::MAX as u64 {
                    MsgValue::Int(v as i64)
                } else {
                    MsgValue::UInt(v)
                }))
            }
            0xd0 => {
                if self.reader.size() < 2 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u8() as i8;
                Ok(Step::Value(MsgValue::Int(v as i64)))
            }
            0xd1 => {
                if self.reader.size() < 3 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u16() as i16;
                Ok(Step::Value(MsgValue::Int(v as i64)))
            }
            0xd2 => {
                if self.reader.size() < 5 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u32() as i32;
                Ok(Step::Value(MsgValue::Int(v as i64)))
            }
            0xd3 => {
                if self.reader.size() < 9 {
                    return Ok(Step::Suspend);
                }
                self.reader.skip(1);
                let v = self.reader.u64() as i64;
                Ok(Step::Value(MsgValue::Int(v)))
            }
            0xd4 => self.read_ext(1, 1),
            0xd5 => self.read_ext(1, 2),
            0xd6 => self.read_ext(1, 4),
            0xd7 => self.read_ext(1, 8),
            0xd8 => self.read_ext(1, 16),
            0xd9 => match self.reader.peek_at(1) {
                Some(len) => self.read_str(2, len as usize),
                None => Ok(Step::Suspend),
            },
            0xda => match self.peek_u16(1) {
                Some(len) => self.read_str(3, len as usize),
                None => Ok(Step::Suspend),
            },
            0xdb => match self.peek_u32(1) {
                Some(len) => self.read_str(5, len as usize),
                None => Ok(Step::Suspend),
            },
            0xdc => match self.peek_u16(1) {
                Some(count) => {
                    self.reader.skip(3);
                    Ok(self.open_arr(count as usize))
                }
                None => Ok(Step::Suspend),
            },
            0xdd => match self.peek_u32(1) {
                Some(count) => {
                    self.reader.skip(5);
                    Ok(self.open_arr(count as usize))
                }
                None => Ok(Step::Suspend),
            },
            0xde => match self.peek_u16(1) {
                Some(count) => {
                    self.reader.skip(3);
                    Ok(self.open_map(count as usize))
                }
                None => Ok(Step::Suspend),
            },
            0xdf => match self.peek_u32(1) {
                Some(count) => {
                    self.reader.skip(5);
                    Ok(self.open_map(count as usize))
                }
                None => Ok(Step::Suspend),
            },
        }
    }

    fn open_arr(&mut self, count: usize) -> Step {
        if count == 0 {
            return Step::Value(MsgValue::Array(Vec::new()));
        }
        self.stack.push(Frame::Array {
            remaining: count,
            items: Vec::with_capacity(count.min(1024)),
        });
        Step::Opened
    }

    fn open_map(&mut self, count: usize) -> Step {
        if count == 0 {
            return Step::Value(MsgValue::Map(Vec::new()));
        }
        self.stack.push(Frame::Map {
            remaining: count,
            pending_key: None,
            items: Vec::with_capacity(count.min(1024)),
        });
        Step::Opened
    }

    /// Consumes header plus payload atomically once both are buffered.
    fn read_str(&mut self, header: usize, length: usize) -> Result<Step, CodecError> {
        if self.reader.size() < header + length {
            return Ok(Step::Suspend);
        }
        self.reader.skip(header);
        let bytes = self.reader.buf(length);
        Ok(Step::Value(MsgValue::Str(cesu8::decode_text(&bytes)?)))
    }

    fn read_bin(&mut self, header: usize, length: usize) -> Result<Step, CodecError> {
        if self.reader.size() < header + length {
            return Ok(Step::Suspend);
        }
        self.reader.skip(header);
        Ok(Step::Value(MsgValue::Bin(self.reader.buf(length))))
    }

    /// `header` excludes the type byte; payload bytes follow it.
    fn read_ext(&mut self, header: usize, length: usize) -> Result<Step, CodecError> {
        if self.reader.size() < header + 1 + length {
            return Ok(Step::Suspend);
        }
        self.reader.skip(header);
        let ext_type = self.reader.u8();
        let data = self.reader.buf(length);
        Ok(Step::Value(self.codec.unpack(ext_type, &data)?))
    }

    fn peek_u16(&self, at: usize) -> Option<u16> {
        let hi = self.reader.peek_at(at)?;
        let lo = self.reader.peek_at(at + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    fn peek_u32(&self, at: usize) -> Option<u32> {
        let b0 = self.reader.peek_at(at)?;
        let b1 = self.reader.peek_at(at + 1)?;
        let b2 = self.reader.peek_at(at + 2)?;
        let b3 = self.reader.peek_at(at + 3)?;
        Some(u32::from_be_bytes([b0, b1, b2, b3]))
    }

    /// Folds a finished value into the open frames, emitting to the
    /// output queue when the stack unwinds to the top level.
    fn complete(&mut self, value: MsgValue) -> Result<(), CodecError> {
        let mut value = value;
        loop {
            match self.stack.last_mut() {
                None => {
                    self.out.push_back(value);
                    return Ok(());
                }
                Some(Frame::Array { remaining, items }) => {
                    items.push(value);
                    *remaining -= 1;
                    if *remaining > 0 {
                        return Ok(());
                    }
                }
                Some(Frame::Map {
                    remaining,
                    pending_key,
                    items,
                }) => {
                    if let Some(key) = pending_key.take() {
                        items.push((key, value));
                        *remaining -= 1;
                        if *remaining > 0 {
                            return Ok(());
                        }
                    } else {
                        match value {
                            MsgValue::Str(key) => {
                                *pending_key = Some(key);
                                return Ok(());
                            }
                            _ => return Err(CodecError::InvalidKey),
                        }
                    }
                }
            }
            value = match self.stack.pop() {
                Some(Frame::Array { items, .. }) => MsgValue::Array(items),
                Some(Frame::Map { items, .. }) => MsgValue::Map(items),
                None => return Ok(()),
            };
        }
    }
}

/// Decodes the first value in `input` using the default registry.
pub fn decode(input: &[u8]) -> Result<MsgValue, CodecError> {
    decode_with(input, default_codec())
}

/// Decodes the first value in `input` against a specific registry.
/// A buffer that ends mid-value is [`CodecError::UnexpectedEof`].
pub fn decode_with(input: &[u8], codec: Arc<ExtCodec>) -> Result<MsgValue, CodecError> {
    let mut decoder = Decoder::with_codec(codec);
    decoder.push(input)?;
    decoder.read().ok_or(CodecError::UnexpectedEof)
}
