//! [`MsgValue`] — the universal value type moved by the codec.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Universal value type for MessagePack encode/decode.
///
/// Every variant has exactly one wire encoding, chosen by the
/// minimal-size rules in the encoder. Maps preserve insertion order;
/// round-tripping an unordered host mapping through [`Map`] is not
/// expected to preserve its original order.
///
/// [`Map`]: MsgValue::Map
#[derive(Debug, Clone, PartialEq)]
pub enum MsgValue {
    /// nil (also the encoding of "absent")
    Nil,
    /// Boolean value
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer beyond i64 range, or explicitly unsigned
    UInt(u64),
    /// Floating-point number (always encoded as float64)
    Float(f64),
    /// String (CESU-8 on the wire)
    Str(String),
    /// Binary blob
    Bin(Vec<u8>),
    /// Ordered sequence
    Array(Vec<MsgValue>),
    /// Ordered key/value mapping (string keys)
    Map(Vec<(String, MsgValue)>),
    /// Extension payload: type id plus opaque bytes
    Ext(ExtVal),
    /// Type-erased user value, routed through the ext registry
    Foreign(ForeignVal),
}

/// A raw extension value: one-byte type id plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtVal {
    pub ext_type: u8,
    pub data: Vec<u8>,
}

impl ExtVal {
    pub fn new(ext_type: u8, data: Vec<u8>) -> Self {
        Self { ext_type, data }
    }
}

/// A type-erased user value carried through the codec.
///
/// The encoder resolves foreign values against the ext registry by
/// their [`TypeId`](std::any::TypeId); unpackers on the decode side
/// rebuild them from payload bytes. Equality is pointer identity —
/// behavioral equality after a round trip is the registry entry
/// author's contract, not this type's.
#[derive(Clone)]
pub struct ForeignVal {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl ForeignVal {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// Runtime type name captured at construction.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub(crate) fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }
}

impl fmt::Debug for ForeignVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignVal").field(&self.type_name).finish()
    }
}

impl PartialEq for ForeignVal {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl MsgValue {
    /// Wraps a user value for registry-routed encoding.
    pub fn foreign<T: Any + Send + Sync>(value: T) -> Self {
        MsgValue::Foreign(ForeignVal::new(value))
    }
}

impl From<serde_json::Value> for MsgValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => MsgValue::Nil,
            serde_json::Value::Bool(b) => MsgValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MsgValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    MsgValue::UInt(u)
                } else {
                    MsgValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => MsgValue::Str(s),
            serde_json::Value::Array(arr) => {
                MsgValue::Array(arr.into_iter().map(MsgValue::from).collect())
            }
            serde_json::Value::Object(obj) => MsgValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, MsgValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<MsgValue> for serde_json::Value {
    fn from(v: MsgValue) -> Self {
        match v {
            MsgValue::Nil => serde_json::Value::Null,
            MsgValue::Bool(b) => serde_json::Value::Bool(b),
            MsgValue::Int(i) => serde_json::json!(i),
            MsgValue::UInt(u) => serde_json::json!(u),
            MsgValue::Float(f) => serde_json::json!(f),
            MsgValue::Str(s) => serde_json::Value::String(s),
            MsgValue::Bin(b) => serde_json::Value::String(format!(
                "data:application/octet-stream;base64,{}",
                BASE64.encode(&b)
            )),
            MsgValue::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            MsgValue::Map(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            MsgValue::Ext(ext) => serde_json::json!({
                "ext_type": ext.ext_type,
                "data": BASE64.encode(&ext.data),
            }),
            MsgValue::Foreign(_) => serde_json::Value::Null,
        }
    }
}
