//! Byte-exact wire checks for every header family.

use mpack::{decode, encode, MsgValue};

fn enc(value: MsgValue) -> Vec<u8> {
    encode(&value).unwrap()
}

#[test]
fn integer_boundaries() {
    let cases: Vec<(i64, Vec<u8>)> = vec![
        (0, vec![0x00]),
        (1, vec![0x01]),
        (127, vec![0x7f]),
        (128, vec![0xcc, 0x80]),
        (255, vec![0xcc, 0xff]),
        (256, vec![0xcd, 0x01, 0x00]),
        (65535, vec![0xcd, 0xff, 0xff]),
        (65536, vec![0xce, 0x00, 0x01, 0x00, 0x00]),
        (-1, vec![0xff]),
        (-32, vec![0xe0]),
        (-33, vec![0xd0, 0xdf]),
        (-128, vec![0xd0, 0x80]),
        (-129, vec![0xd1, 0xff, 0x7f]),
        (-32768, vec![0xd1, 0x80, 0x00]),
        (-32769, vec![0xd2, 0xff, 0xff, 0x7f, 0xff]),
    ];
    for (int, bytes) in cases {
        assert_eq!(enc(MsgValue::Int(int)), bytes, "encoding {int}");
        assert_eq!(decode(&bytes).unwrap(), MsgValue::Int(int), "decoding {int}");
    }
}

#[test]
fn wide_integers() {
    let out = enc(MsgValue::Int(4_294_967_295));
    assert_eq!(out, [0xce, 0xff, 0xff, 0xff, 0xff]);
    let out = enc(MsgValue::Int(4_294_967_296));
    assert_eq!(out[0], 0xd3);
    assert_eq!(decode(&out).unwrap(), MsgValue::Int(4_294_967_296));
    let out = enc(MsgValue::Int(-4_294_967_296));
    assert_eq!(out[0], 0xd3);
    assert_eq!(decode(&out).unwrap(), MsgValue::Int(-4_294_967_296));
    let out = enc(MsgValue::UInt(u64::MAX));
    assert_eq!(out, [0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    assert_eq!(decode(&out).unwrap(), MsgValue::UInt(u64::MAX));
}

#[test]
fn floats_are_float64_even_when_integral() {
    let out = enc(MsgValue::Float(2.0));
    assert_eq!(out[0], 0xcb);
    assert_eq!(out[1..], 2.0f64.to_be_bytes());
    assert_eq!(decode(&out).unwrap(), MsgValue::Float(2.0));
}

#[test]
fn string_header_classes_are_minimal() {
    for (len, header) in [
        (0usize, vec![0xa0]),
        (31, vec![0xbf]),
        (32, vec![0xd9, 32]),
        (255, vec![0xd9, 255]),
        (256, vec![0xda, 0x01, 0x00]),
        (65535, vec![0xda, 0xff, 0xff]),
        (65536, vec![0xdb, 0x00, 0x01, 0x00, 0x00]),
    ] {
        let out = enc(MsgValue::Str("s".repeat(len)));
        assert_eq!(&out[..header.len()], header.as_slice(), "length {len}");
        assert_eq!(out.len(), header.len() + len);
    }
}

#[test]
fn multibyte_text_header_uses_byte_length() {
    // 11 code units, 33 bytes: str8, not fixstr.
    let s = "€".repeat(11);
    let out = enc(MsgValue::Str(s.clone()));
    assert_eq!(&out[..2], &[0xd9, 33]);
    assert_eq!(decode(&out).unwrap(), MsgValue::Str(s));
}

#[test]
fn supplementary_plane_text_is_cesu8() {
    let out = enc(MsgValue::Str("\u{1F600}".to_string()));
    // Surrogate pair: two 3-byte sequences behind a fixstr header.
    assert_eq!(out[0], 0xa0 | 6);
    assert_eq!(out[1], 0xed);
    assert_eq!(out[4], 0xed);
    assert_eq!(
        decode(&out).unwrap(),
        MsgValue::Str("\u{1F600}".to_string())
    );
}

#[test]
fn bin_header_classes() {
    for (len, header) in [
        (0usize, vec![0xc4, 0]),
        (254, vec![0xc4, 254]),
        // 255 already takes the two-byte length form.
        (255, vec![0xc5, 0x00, 0xff]),
        (65535, vec![0xc5, 0xff, 0xff]),
        (65536, vec![0xc6, 0x00, 0x01, 0x00, 0x00]),
    ] {
        let data = vec![0xabu8; len];
        let out = enc(MsgValue::Bin(data.clone()));
        assert_eq!(&out[..header.len()], header.as_slice(), "length {len}");
        assert_eq!(decode(&out).unwrap(), MsgValue::Bin(data));
    }
}

#[test]
fn array_header_classes() {
    for (len, header) in [
        (0usize, vec![0x90]),
        (15, vec![0x9f]),
        (16, vec![0xdc, 0x00, 0x10]),
        (65536, vec![0xdd, 0x00, 0x01, 0x00, 0x00]),
    ] {
        let arr = MsgValue::Array(vec![MsgValue::Nil; len]);
        let out = enc(arr.clone());
        assert_eq!(&out[..header.len()], header.as_slice(), "length {len}");
        assert_eq!(decode(&out).unwrap(), arr);
    }
}

#[test]
fn map_header_classes() {
    for (len, header) in [
        (0usize, vec![0x80]),
        (15, vec![0x8f]),
        (16, vec![0xde, 0x00, 0x10]),
    ] {
        let map = MsgValue::Map(
            (0..len)
                .map(|i| (format!("k{i:04}"), MsgValue::Int(i as i64)))
                .collect(),
        );
        let out = enc(map.clone());
        assert_eq!(&out[..header.len()], header.as_slice(), "length {len}");
        assert_eq!(decode(&out).unwrap(), map);
    }
}

#[test]
fn ext_header_classes() {
    use mpack::ExtVal;
    for (len, header) in [
        (1usize, vec![0xd4, 0x07]),
        (2, vec![0xd5, 0x07]),
        (4, vec![0xd6, 0x07]),
        (8, vec![0xd7, 0x07]),
        (16, vec![0xd8, 0x07]),
        (3, vec![0xc7, 3, 0x07]),
        (255, vec![0xc7, 255, 0x07]),
        (256, vec![0xc8, 0x01, 0x00, 0x07]),
        (65536, vec![0xc9, 0x00, 0x01, 0x00, 0x00, 0x07]),
    ] {
        let ext = MsgValue::Ext(ExtVal::new(0x07, vec![0x5a; len]));
        let out = enc(ext.clone());
        assert_eq!(&out[..header.len()], header.as_slice(), "length {len}");
        assert_eq!(decode(&out).unwrap(), ext, "length {len}");
    }
}

#[test]
fn deeply_nested_value_roundtrips() {
    let mut value = MsgValue::Int(0);
    for _ in 0..100 {
        value = MsgValue::Array(vec![value, MsgValue::Nil]);
    }
    let out = enc(value.clone());
    assert_eq!(decode(&out).unwrap(), value);
}
