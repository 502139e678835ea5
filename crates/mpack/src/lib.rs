//! MessagePack codec with an extensible ext-type registry.
//!
//! The codec moves [`MsgValue`] trees: encode picks the minimal wire
//! form for every value, decode rebuilds the tree and can resume
//! across arbitrarily split input chunks. Host types outside the
//! MessagePack data model travel as ext values through an
//! [`ExtCodec`] registry, which ships presets for timestamps, packed
//! errors, and fixed-width numeric arrays.
//!
//! ```
//! use mpack::{decode, encode, MsgValue};
//!
//! let value = MsgValue::Map(vec![
//!     ("id".to_string(), MsgValue::Int(7)),
//!     ("tags".to_string(), MsgValue::Array(vec![MsgValue::Str("a".into())])),
//! ]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

use std::sync::Arc;

mod cesu8;
mod decoder;
mod encoder;
mod error;
mod ext;
mod stream;
mod value;

pub use crate::decoder::{decode, decode_with, Decoder};
pub use crate::encoder::Encoder;
pub use crate::error::CodecError;
pub use crate::ext::{
    default_codec, CodecOptions, ExtCodec, PackedError, EXT_DATE, EXT_ERROR, EXT_F32_ARRAY,
    EXT_F64_ARRAY, EXT_I16_ARRAY, EXT_I32_ARRAY, EXT_I8_ARRAY, EXT_U16_ARRAY, EXT_U32_ARRAY,
};
pub use crate::stream::{DecodeStream, EncodeStream};
pub use crate::value::{ExtVal, ForeignVal, MsgValue};

pub mod text {
    //! CESU-8 text conversion, exposed for payloads that embed strings
    //! outside a full encoded value.
    pub use crate::cesu8::{byte_length, decode_text, encode_text};
}

/// Encodes `value` using the process-wide default registry.
pub fn encode(value: &MsgValue) -> Result<Vec<u8>, CodecError> {
    Encoder::new().encode(value)
}

/// Encodes `value` against a specific registry.
pub fn encode_with(value: &MsgValue, codec: Arc<ExtCodec>) -> Result<Vec<u8>, CodecError> {
    Encoder::with_codec(codec).encode(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: MsgValue) {
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn roundtrip_scalars() {
        roundtrip(MsgValue::Nil);
        roundtrip(MsgValue::Bool(false));
        roundtrip(MsgValue::Bool(true));
        for int in [0, 1, -1, 127, 128, -32, -33, 255, 256, 65535, 65536, -129] {
            roundtrip(MsgValue::Int(int));
        }
        roundtrip(MsgValue::Int(i64::MIN));
        roundtrip(MsgValue::Int(i64::MAX));
        roundtrip(MsgValue::UInt(u64::MAX));
        for float in [0.0, -0.5, 2.0, 1e300, f64::MIN_POSITIVE] {
            roundtrip(MsgValue::Float(float));
        }
    }

    #[test]
    fn roundtrip_strings_and_bytes() {
        roundtrip(MsgValue::Str(String::new()));
        roundtrip(MsgValue::Str("plain ascii".to_string()));
        roundtrip(MsgValue::Str("größer \u{1F680} text".to_string()));
        roundtrip(MsgValue::Str("x".repeat(70_000)));
        roundtrip(MsgValue::Bin(Vec::new()));
        roundtrip(MsgValue::Bin((0..=255).collect()));
    }

    #[test]
    fn roundtrip_containers_preserve_order() {
        let map = MsgValue::Map(vec![
            ("zeta".to_string(), MsgValue::Int(1)),
            ("alpha".to_string(), MsgValue::Int(2)),
            ("mid".to_string(), MsgValue::Array(vec![MsgValue::Nil])),
        ]);
        roundtrip(map);
        roundtrip(MsgValue::Array(
            (0..100).map(MsgValue::Int).collect(),
        ));
    }

    #[test]
    fn roundtrip_preset_date() {
        use std::time::{Duration, UNIX_EPOCH};
        let time = UNIX_EPOCH + Duration::from_millis(1_600_000_000_000);
        let bytes = encode(&MsgValue::foreign(time)).unwrap();
        assert_eq!(bytes[0], 0xc7);
        assert_eq!(bytes[2], EXT_DATE);
        let MsgValue::Foreign(back) = decode(&bytes).unwrap() else {
            panic!()
        };
        assert!(back.is::<std::time::SystemTime>());
    }

    #[test]
    fn roundtrip_custom_registration() {
        #[derive(Debug, PartialEq, Clone)]
        struct Point {
            x: u16,
            y: u16,
        }
        let mut codec = default_codec().extend(CodecOptions::default());
        codec.add_ext_packer::<Point, _>(0x01, |p| {
            Ok([p.x.to_be_bytes(), p.y.to_be_bytes()].concat())
        });
        codec.add_ext_unpacker(0x01, |data| {
            if data.len() != 4 {
                return Err(CodecError::ExtPayload(0x01));
            }
            Ok(MsgValue::foreign(Point {
                x: u16::from_be_bytes([data[0], data[1]]),
                y: u16::from_be_bytes([data[2], data[3]]),
            }))
        });
        let codec = Arc::new(codec);
        let point = Point { x: 3, y: 70 };
        let bytes = encode_with(&MsgValue::foreign(point.clone()), codec.clone()).unwrap();
        // 4-byte payload takes the fixext4 form.
        assert_eq!(&bytes[..2], &[0xd6, 0x01]);
        let MsgValue::Foreign(back) = decode_with(&bytes, codec).unwrap() else {
            panic!()
        };
        assert_eq!(back.downcast_ref::<Point>(), Some(&point));
    }

    #[test]
    fn unregistered_foreign_value_fails_encode() {
        struct Opaque;
        let err = encode(&MsgValue::foreign(Opaque)).unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(_)));
    }

    #[test]
    fn json_to_wire_and_back() {
        let json = serde_json::json!({
            "name": "codec",
            "versions": [1, 2, 3],
            "stable": true,
            "score": 0.5,
        });
        let bytes = encode(&MsgValue::from(json.clone())).unwrap();
        let back: serde_json::Value = decode(&bytes).unwrap().into();
        assert_eq!(back, json);
    }
}
