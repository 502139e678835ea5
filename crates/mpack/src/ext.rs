//! Ext-type registry: maps foreign values to ext payloads and back.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::decoder::decode_with;
use crate::encoder::Encoder;
use crate::error::CodecError;
use crate::value::{ExtVal, ForeignVal, MsgValue};

/// Ext id for [`SystemTime`]: payload is an encoded float64 of
/// milliseconds since the Unix epoch.
pub const EXT_DATE: u8 = 0x0d;
/// Ext id for [`PackedError`]: payload is an encoded map with `name`
/// and `message` keys.
pub const EXT_ERROR: u8 = 0x0e;
/// Typed-array ext ids: payload is the raw little-endian element
/// bytes, not a nested encoded value.
pub const EXT_I8_ARRAY: u8 = 0x11;
pub const EXT_I16_ARRAY: u8 = 0x13;
pub const EXT_U16_ARRAY: u8 = 0x14;
pub const EXT_I32_ARRAY: u8 = 0x15;
pub const EXT_U32_ARRAY: u8 = 0x16;
pub const EXT_F32_ARRAY: u8 = 0x17;
pub const EXT_F64_ARRAY: u8 = 0x18;

/// A packable error: name plus message, round-trippable as ext
/// [`EXT_ERROR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedError {
    pub name: String,
    pub message: String,
}

impl PackedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Registry construction flags.
#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    /// Ignore the preset entries (dates, errors, typed arrays); only
    /// explicitly registered entries apply.
    pub safe: bool,
    /// On decode, surface payloads with an unregistered ext id as
    /// [`MsgValue::Ext`] instead of failing.
    pub fallback: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            safe: false,
            fallback: true,
        }
    }
}

type PackFn = Arc<dyn Fn(&ForeignVal) -> Result<Vec<u8>, CodecError> + Send + Sync>;
type MatchFn = Arc<dyn Fn(&ForeignVal) -> bool + Send + Sync>;
type UnpackFn = Arc<dyn Fn(&[u8]) -> Result<MsgValue, CodecError> + Send + Sync>;

#[derive(Clone)]
struct ExtPacker {
    ext_type: u8,
    preset: bool,
    matches: MatchFn,
    pack: PackFn,
}

#[derive(Clone)]
struct ExtUnpacker {
    preset: bool,
    unpack: UnpackFn,
}

/// Two-way ext registry.
///
/// Encode side: foreign values resolve by concrete [`TypeId`] first,
/// then by registration-order predicate probe (for entries registered
/// with [`add_ext_packer_with`](ExtCodec::add_ext_packer_with)).
/// Decode side: ext ids resolve to unpackers; unknown ids fall back to
/// a raw [`MsgValue::Ext`] unless `fallback` was disabled.
///
/// A registry is immutable once shared; [`extend`](ExtCodec::extend)
/// produces an independent copy to add entries to.
#[derive(Clone)]
pub struct ExtCodec {
    packers: Vec<ExtPacker>,
    by_type: HashMap<TypeId, usize>,
    unpackers: HashMap<u8, ExtUnpacker>,
    safe: bool,
    fallback: bool,
}

impl Default for ExtCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtCodec {
    /// Creates a registry with the preset entries and default options.
    pub fn new() -> Self {
        Self::with_options(CodecOptions::default())
    }

    /// Creates a registry with the preset entries and the given
    /// options.
    pub fn with_options(options: CodecOptions) -> Self {
        let mut codec = Self::empty(options);
        codec.install_presets();
        codec
    }

    /// Creates a registry with no entries at all.
    pub fn empty(options: CodecOptions) -> Self {
        Self {
            packers: Vec::new(),
            by_type: HashMap::new(),
            unpackers: HashMap::new(),
            safe: options.safe,
            fallback: options.fallback,
        }
    }

    /// Returns an independent copy with the given options; entries are
    /// inherited, later registrations shadow earlier ones.
    pub fn extend(&self, options: CodecOptions) -> Self {
        let mut codec = self.clone();
        codec.safe = options.safe;
        codec.fallback = options.fallback;
        codec
    }

    /// Registers a packer for concrete type `T` under `ext_type`.
    /// Registering the same `T` again shadows the earlier entry.
    pub fn add_ext_packer<T, F>(&mut self, ext_type: u8, pack: F)
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<Vec<u8>, CodecError> + Send + Sync + 'static,
    {
        self.add_packer::<T, F>(ext_type, false, pack);
    }

    /// Registers a packer gated by an arbitrary predicate instead of a
    /// concrete type. Probed in registration order, after the typed
    /// fast path.
    pub fn add_ext_packer_with<M, F>(&mut self, ext_type: u8, matches: M, pack: F)
    where
        M: Fn(&ForeignVal) -> bool + Send + Sync + 'static,
        F: Fn(&ForeignVal) -> Result<Vec<u8>, CodecError> + Send + Sync + 'static,
    {
        self.packers.push(ExtPacker {
            ext_type,
            preset: false,
            matches: Arc::new(matches),
            pack: Arc::new(pack),
        });
    }

    /// Registers an unpacker for `ext_type`, replacing any earlier
    /// entry for the same id.
    pub fn add_ext_unpacker<F>(&mut self, ext_type: u8, unpack: F)
    where
        F: Fn(&[u8]) -> Result<MsgValue, CodecError> + Send + Sync + 'static,
    {
        self.unpackers.insert(
            ext_type,
            ExtUnpacker {
                preset: false,
                unpack: Arc::new(unpack),
            },
        );
    }

    /// Resolves a foreign value to `(ext_type, payload)`, or `None`
    /// when no entry claims it.
    pub fn pack(&self, foreign: &ForeignVal) -> Result<Option<(u8, Vec<u8>)>, CodecError> {
        if let Some(&index) = self.by_type.get(&foreign.as_any().type_id()) {
            let packer = &self.packers[index];
            if !(self.safe && packer.preset) {
                return Ok(Some((packer.ext_type, (packer.pack)(foreign)?)));
            }
        }
        for packer in &self.packers {
            if self.safe && packer.preset {
                continue;
            }
            if (packer.matches)(foreign) {
                return Ok(Some((packer.ext_type, (packer.pack)(foreign)?)));
            }
        }
        Ok(None)
    }

    /// Rebuilds a value from an ext payload. Unknown ids produce a raw
    /// [`MsgValue::Ext`] when the fallback is enabled, otherwise
    /// [`CodecError::UnknownExtType`].
    pub fn unpack(&self, ext_type: u8, data: &[u8]) -> Result<MsgValue, CodecError> {
        if let Some(entry) = self.unpackers.get(&ext_type) {
            if !(self.safe && entry.preset) {
                return (entry.unpack)(data);
            }
        }
        if self.fallback {
            return Ok(MsgValue::Ext(ExtVal::new(ext_type, data.to_vec())));
        }
        Err(CodecError::UnknownExtType(ext_type))
    }

    fn add_packer<T, F>(&mut self, ext_type: u8, preset: bool, pack: F)
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> Result<Vec<u8>, CodecError> + Send + Sync + 'static,
    {
        let pack: PackFn = Arc::new(move |foreign: &ForeignVal| {
            let value = foreign
                .downcast_ref::<T>()
                .ok_or(CodecError::UnknownType(foreign.type_name()))?;
            pack(value)
        });
        let index = self.packers.len();
        self.packers.push(ExtPacker {
            ext_type,
            preset,
            matches: Arc::new(|foreign: &ForeignVal| foreign.is::<T>()),
            pack,
        });
        self.by_type.insert(TypeId::of::<T>(), index);
    }

    fn add_unpacker<F>(&mut self, ext_type: u8, preset: bool, unpack: F)
    where
        F: Fn(&[u8]) -> Result<MsgValue, CodecError> + Send + Sync + 'static,
    {
        self.unpackers.insert(
            ext_type,
            ExtUnpacker {
                preset,
                unpack: Arc::new(unpack),
            },
        );
    }

    fn install_presets(&mut self) {
        self.add_packer::<SystemTime, _>(EXT_DATE, true, |time| {
            let millis = match time.duration_since(UNIX_EPOCH) {
                Ok(elapsed) => elapsed.as_secs_f64() * 1000.0,
                Err(before) => -(before.duration().as_secs_f64() * 1000.0),
            };
            encode_plain(&MsgValue::Float(millis))
        });
        self.add_unpacker(EXT_DATE, true, |data| {
            let millis = match decode_plain(data)? {
                MsgValue::Float(f) => f,
                MsgValue::Int(i) => i as f64,
                MsgValue::UInt(u) => u as f64,
                _ => return Err(CodecError::ExtPayload(EXT_DATE)),
            };
            // Payload bytes are untrusted: NaN, infinite, and
            // out-of-range magnitudes must error, not panic.
            let magnitude = Duration::try_from_secs_f64(millis.abs() / 1000.0)
                .map_err(|_| CodecError::ExtPayload(EXT_DATE))?;
            let time = if millis >= 0.0 {
                UNIX_EPOCH.checked_add(magnitude)
            } else {
                UNIX_EPOCH.checked_sub(magnitude)
            };
            match time {
                Some(time) => Ok(MsgValue::foreign(time)),
                None => Err(CodecError::ExtPayload(EXT_DATE)),
            }
        });

        self.add_packer::<PackedError, _>(EXT_ERROR, true, |error| {
            encode_plain(&MsgValue::Map(vec![
                ("name".to_string(), MsgValue::Str(error.name.clone())),
                ("message".to_string(), MsgValue::Str(error.message.clone())),
            ]))
        });
        self.add_unpacker(EXT_ERROR, true, |data| {
            let MsgValue::Map(fields) = decode_plain(data)? else {
                return Err(CodecError::ExtPayload(EXT_ERROR));
            };
            let mut name = None;
            let mut message = None;
            for (key, value) in fields {
                match (key.as_str(), value) {
                    ("name", MsgValue::Str(s)) => name = Some(s),
                    ("message", MsgValue::Str(s)) => message = Some(s),
                    _ => {}
                }
            }
            match (name, message) {
                (Some(name), Some(message)) => {
                    Ok(MsgValue::foreign(PackedError { name, message }))
                }
                _ => Err(CodecError::ExtPayload(EXT_ERROR)),
            }
        });

        self.install_typed_array::<i8>(EXT_I8_ARRAY);
        self.install_typed_array::<i16>(EXT_I16_ARRAY);
        self.install_typed_array::<u16>(EXT_U16_ARRAY);
        self.install_typed_array::<i32>(EXT_I32_ARRAY);
        self.install_typed_array::<u32>(EXT_U32_ARRAY);
        self.install_typed_array::<f32>(EXT_F32_ARRAY);
        self.install_typed_array::<f64>(EXT_F64_ARRAY);
    }

    fn install_typed_array<T: LeElement>(&mut self, ext_type: u8) {
        self.add_packer::<Vec<T>, _>(ext_type, true, |items| {
            let mut out = Vec::with_capacity(items.len() * T::WIDTH);
            for item in items {
                item.write_le(&mut out);
            }
            Ok(out)
        });
        self.add_unpacker(ext_type, true, move |data| {
            if data.len() % T::WIDTH != 0 {
                return Err(CodecError::ExtPayload(ext_type));
            }
            let items: Vec<T> = data.chunks_exact(T::WIDTH).map(T::read_le).collect();
            Ok(MsgValue::foreign(items))
        });
    }
}

/// Fixed-width element of a typed-array ext payload.
trait LeElement: Any + Copy + Send + Sync {
    const WIDTH: usize;
    fn write_le(&self, out: &mut Vec<u8>);
    /// `chunk` is exactly `WIDTH` bytes.
    fn read_le(chunk: &[u8]) -> Self;
}

macro_rules! le_element {
    ($($t:ty),*) => {$(
        impl LeElement for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
            fn read_le(chunk: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$t>()];
                bytes.copy_from_slice(chunk);
                <$t>::from_le_bytes(bytes)
            }
        }
    )*};
}

le_element!(i8, i16, u16, i32, u32, f32, f64);

/// Process-wide default registry: presets, fallback enabled.
pub fn default_codec() -> Arc<ExtCodec> {
    static DEFAULT: OnceLock<Arc<ExtCodec>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(ExtCodec::new())).clone()
}

/// Encodes a payload value without consulting any registry. Used by
/// preset packers whose payloads are themselves encoded values.
fn encode_plain(value: &MsgValue) -> Result<Vec<u8>, CodecError> {
    Encoder::with_codec(Arc::new(ExtCodec::empty(CodecOptions::default()))).encode(value)
}

fn decode_plain(data: &[u8]) -> Result<MsgValue, CodecError> {
    decode_with(data, Arc::new(ExtCodec::empty(CodecOptions::default())))
}
