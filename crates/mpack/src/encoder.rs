//! MessagePack encoder over a chunk-batching writer.

use std::sync::Arc;

use mpack_buffers::ChunkWriter;

use crate::cesu8;
use crate::error::CodecError;
use crate::ext::{default_codec, ExtCodec};
use crate::value::{ExtVal, ForeignVal, MsgValue};

/// Encodes one [`MsgValue`] at a time into MessagePack bytes.
///
/// Output is batched into fixed-size chunks (8192 bytes by default);
/// [`encode`](Encoder::encode) concatenates them, while
/// [`encode_to`](Encoder::encode_to) pushes each chunk to a sink as it
/// fills. Values with no built-in wire shape are routed through the
/// ext registry.
pub struct Encoder {
    pub writer: ChunkWriter,
    codec: Arc<ExtCodec>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates an encoder using the process-wide default registry.
    pub fn new() -> Self {
        Self::with_codec(default_codec())
    }

    /// Creates an encoder using the given registry.
    pub fn with_codec(codec: Arc<ExtCodec>) -> Self {
        Self {
            writer: ChunkWriter::new(),
            codec,
        }
    }

    /// Creates an encoder with a custom output chunk size.
    pub fn with_chunk_size(chunk_size: usize, codec: Arc<ExtCodec>) -> Self {
        Self {
            writer: ChunkWriter::with_chunk_size(chunk_size),
            codec,
        }
    }

    /// Encodes `value` and returns its wire bytes.
    pub fn encode(&mut self, value: &MsgValue) -> Result<Vec<u8>, CodecError> {
        self.writer.reset();
        self.write_any(value)?;
        Ok(self.writer.flush())
    }

    /// Encodes `value`, pushing each output chunk to `push` in order.
    pub fn encode_to(
        &mut self,
        value: &MsgValue,
        push: &mut dyn FnMut(Vec<u8>),
    ) -> Result<(), CodecError> {
        self.writer.reset();
        self.write_any(value)?;
        for chunk in self.writer.flush_chunks() {
            push(chunk);
        }
        Ok(())
    }

    pub fn write_any(&mut self, value: &MsgValue) -> Result<(), CodecError> {
        match value {
            MsgValue::Nil => {
                self.writer.u8(0xc0);
                Ok(())
            }
            MsgValue::Bool(b) => {
                self.writer.u8(if *b { 0xc3 } else { 0xc2 });
                Ok(())
            }
            MsgValue::Int(i) => {
                self.write_integer(*i);
                Ok(())
            }
            MsgValue::UInt(u) => {
                self.write_uinteger(*u);
                Ok(())
            }
            MsgValue::Float(f) => {
                self.write_float(*f);
                Ok(())
            }
            MsgValue::Str(s) => {
                self.write_str(s);
                Ok(())
            }
            MsgValue::Bin(b) => {
                self.write_bin(b);
                Ok(())
            }
            MsgValue::Array(arr) => self.write_arr(arr),
            MsgValue::Map(map) => self.write_map(map),
            MsgValue::Ext(ext) => {
                self.write_ext(ext);
                Ok(())
            }
            MsgValue::Foreign(foreign) => self.write_foreign(foreign),
        }
    }

    /// Floats always take the float64 form; there is no float32 fast
    /// path on encode.
    pub fn write_float(&mut self, float: f64) {
        self.writer.u8f64(0xcb, float);
    }

    pub fn write_integer(&mut self, int: i64) {
        if (-0x20..=0x7f).contains(&int) {
            // fixint, two's complement byte for negatives
            self.writer.u8(int as i8 as u8);
        } else if int >= 0 {
            if int <= 0xff {
                self.writer.u8u8(0xcc, int as u8);
            } else if int <= 0xffff {
                self.writer.u8u16(0xcd, int as u16);
            } else if int <= 0xffff_ffff {
                self.writer.u8u32(0xce, int as u32);
            } else {
                self.writer.u8u64(0xd3, int as u64);
            }
        } else if int >= -0x80 {
            self.writer.u8u8(0xd0, int as i8 as u8);
        } else if int >= -0x8000 {
            self.writer.u8u16(0xd1, int as i16 as u16);
        } else if int >= -0x8000_0000 {
            self.writer.u8u32(0xd2, int as i32 as u32);
        } else {
            self.writer.u8u64(0xd3, int as u64);
        }
    }

    pub fn write_uinteger(&mut self, uint: u64) {
        if uint <= 0x7f {
            self.writer.u8(uint as u8);
        } else if uint <= 0xff {
            self.writer.u8u8(0xcc, uint as u8);
        } else if uint <= 0xffff {
            self.writer.u8u16(0xcd, uint as u16);
        } else if uint <= 0xffff_ffff {
            self.writer.u8u32(0xce, uint as u32);
        } else {
            self.writer.u8u64(0xcf, uint);
        }
    }

    /// Two-pass string write: the header size class is guessed from
    /// the UTF-16 code-unit count, the text is written past the
    /// reserved header, and the content is shifted when the actual
    /// byte length lands in a different class. The final header is
    /// always the minimal one for the actual byte length.
    pub fn write_str(&mut self, s: &str) {
        let units = s.encode_utf16().count();
        self.writer.reserve(5 + units * 3);
        let x = self.writer.x;
        let expected = str_hdr_size(units);
        let n = cesu8::write_text(&mut self.writer.buf[x + expected..], s);
        let actual = str_hdr_size(n);
        if actual != expected {
            self.writer
                .buf
                .copy_within(x + expected..x + expected + n, x + actual);
        }
        match actual {
            1 => self.writer.buf[x] = 0xa0 | n as u8,
            2 => {
                self.writer.buf[x] = 0xd9;
                self.writer.buf[x + 1] = n as u8;
            }
            3 => {
                self.writer.buf[x] = 0xda;
                self.writer.buf[x + 1..x + 3].copy_from_slice(&(n as u16).to_be_bytes());
            }
            _ => {
                self.writer.buf[x] = 0xdb;
                self.writer.buf[x + 1..x + 5].copy_from_slice(&(n as u32).to_be_bytes());
            }
        }
        self.writer.x = x + actual + n;
    }

    pub fn write_bin(&mut self, data: &[u8]) {
        let length = data.len();
        if length < 0xff {
            self.writer.u8u8(0xc4, length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(0xc5, length as u16);
        } else {
            self.writer.u8u32(0xc6, length as u32);
        }
        self.writer.bytes(data);
    }

    pub fn write_arr_hdr(&mut self, length: usize) {
        if length < 16 {
            self.writer.u8(0x90 | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(0xdc, length as u16);
        } else {
            self.writer.u8u32(0xdd, length as u32);
        }
    }

    pub fn write_arr(&mut self, arr: &[MsgValue]) -> Result<(), CodecError> {
        self.write_arr_hdr(arr.len());
        for item in arr {
            self.write_any(item)?;
        }
        Ok(())
    }

    pub fn write_map_hdr(&mut self, length: usize) {
        if length < 16 {
            self.writer.u8(0x80 | length as u8);
        } else if length <= 0xffff {
            self.writer.u8u16(0xde, length as u16);
        } else {
            self.writer.u8u32(0xdf, length as u32);
        }
    }

    pub fn write_map(&mut self, map: &[(String, MsgValue)]) -> Result<(), CodecError> {
        self.write_map_hdr(map.len());
        for (key, val) in map {
            self.write_str(key);
            self.write_any(val)?;
        }
        Ok(())
    }

    pub fn write_ext(&mut self, ext: &ExtVal) {
        let length = ext.data.len();
        match length {
            1 => self.writer.u8u8(0xd4, ext.ext_type),
            2 => self.writer.u8u8(0xd5, ext.ext_type),
            4 => self.writer.u8u8(0xd6, ext.ext_type),
            8 => self.writer.u8u8(0xd7, ext.ext_type),
            16 => self.writer.u8u8(0xd8, ext.ext_type),
            _ => {
                if length <= 0xff {
                    self.writer.u8u8(0xc7, length as u8);
                } else if length <= 0xffff {
                    self.writer.u8u16(0xc8, length as u16);
                } else {
                    self.writer.u8u32(0xc9, length as u32);
                }
                self.writer.u8(ext.ext_type);
            }
        }
        self.writer.bytes(&ext.data);
    }

    fn write_foreign(&mut self, foreign: &ForeignVal) -> Result<(), CodecError> {
        match self.codec.pack(foreign)? {
            Some((ext_type, data)) => {
                self.write_ext(&ExtVal::new(ext_type, data));
                Ok(())
            }
            None => Err(CodecError::UnknownType(foreign.type_name())),
        }
    }
}

fn str_hdr_size(byte_length: usize) -> usize {
    if byte_length < 32 {
        1
    } else if byte_length <= 0xff {
        2
    } else if byte_length <= 0xffff {
        3
    } else {
        5
    }
}
