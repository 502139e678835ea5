//! Text Codec: CESU-8 string ↔ byte conversion.
//!
//! Each UTF-16 code unit is encoded independently as a 1, 2, or
//! 3-byte sequence. Surrogate pairs therefore become two 3-byte
//! sequences instead of one 4-byte UTF-8 sequence, which keeps the
//! per-unit worst case at 3 bytes and makes `5 + 3 * units` a valid
//! buffer reservation for any string plus its largest header.

use crate::error::CodecError;

/// Decode window size, in code units.
const MAX_WINDOW: usize = 8192;

/// Exact number of bytes [`encode_text`] would produce, without
/// allocating the output.
pub fn byte_length(s: &str) -> usize {
    s.encode_utf16()
        .map(|unit| {
            if unit < 0x80 {
                1
            } else if unit < 0x800 {
                2
            } else {
                3
            }
        })
        .sum()
}

/// Encodes `s` as CESU-8 into `dst`, returning the number of bytes
/// written. `dst` must hold at least [`byte_length`]`(s)` bytes.
pub fn write_text(dst: &mut [u8], s: &str) -> usize {
    let mut index = 0;
    for unit in s.encode_utf16() {
        if unit < 0x80 {
            dst[index] = unit as u8;
            index += 1;
        } else if unit < 0x800 {
            dst[index] = 0xc0 | (unit >> 6) as u8;
            dst[index + 1] = 0x80 | (unit & 0x3f) as u8;
            index += 2;
        } else {
            dst[index] = 0xe0 | (unit >> 12) as u8;
            dst[index + 1] = 0x80 | ((unit >> 6) & 0x3f) as u8;
            dst[index + 2] = 0x80 | (unit & 0x3f) as u8;
            index += 3;
        }
    }
    index
}

/// Encodes `s` as a fresh CESU-8 byte vector.
pub fn encode_text(s: &str) -> Vec<u8> {
    let mut out = vec![0u8; byte_length(s)];
    let n = write_text(&mut out, s);
    out.truncate(n);
    out
}

/// Decodes CESU-8 `bytes` back into a string.
///
/// Inverse of [`encode_text`] for every valid CESU-8 sequence. Large
/// inputs are converted in bounded windows; a window never splits a
/// surrogate pair.
pub fn decode_text(bytes: &[u8]) -> Result<String, CodecError> {
    let mut out = String::with_capacity(bytes.len());
    let mut units: Vec<u16> = Vec::with_capacity(MAX_WINDOW.min(bytes.len()));
    let mut index = 0;
    let end = bytes.len();
    while index < end {
        let lead = bytes[index];
        let unit = if lead < 0x80 {
            index += 1;
            lead as u16
        } else if lead < 0xc0 {
            // A continuation byte is never a valid lead.
            return Err(CodecError::InvalidText);
        } else if lead < 0xe0 {
            if index + 2 > end {
                return Err(CodecError::InvalidText);
            }
            let unit = (((lead & 0x3f) as u16) << 6) | (bytes[index + 1] & 0x3f) as u16;
            index += 2;
            unit
        } else {
            if index + 3 > end {
                return Err(CodecError::InvalidText);
            }
            let unit = (((lead & 0x3f) as u16) << 12)
                | (((bytes[index + 1] & 0x3f) as u16) << 6)
                | (bytes[index + 2] & 0x3f) as u16;
            index += 3;
            unit
        };
        units.push(unit);
        if units.len() >= MAX_WINDOW {
            flush_units(&mut out, &mut units)?;
        }
    }
    let tail = String::from_utf16(&units).map_err(|_| CodecError::InvalidText)?;
    out.push_str(&tail);
    Ok(out)
}

/// Converts the buffered units, holding back a trailing high
/// surrogate so its pair lands in the same conversion.
fn flush_units(out: &mut String, units: &mut Vec<u16>) -> Result<(), CodecError> {
    let mut split = units.len();
    if let Some(&last) = units.last() {
        if (0xd800..=0xdbff).contains(&last) {
            split -= 1;
        }
    }
    let converted = String::from_utf16(&units[..split]).map_err(|_| CodecError::InvalidText)?;
    out.push_str(&converted);
    units.drain(..split);
    Ok(())
}
