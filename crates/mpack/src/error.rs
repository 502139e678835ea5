use thiserror::Error;

/// Errors raised by the encode and decode paths.
///
/// Truncated input is deliberately not represented here on the
/// streaming path: running out of bytes mid-value suspends the decoder
/// until the next chunk arrives. Only the one-shot [`decode`] reports
/// it, as [`CodecError::UnexpectedEof`].
///
/// [`decode`]: crate::decode
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Encode: the value matches no built-in shape and no registry
    /// entry. Carries the runtime type name of the offending value.
    #[error("unknown type: {0}")]
    UnknownType(&'static str),
    /// Decode: a tag byte outside every defined range. Terminal for
    /// the current decode; no resynchronization is attempted.
    #[error("invalid format: byte 0x{byte:02x} at offset {offset}")]
    InvalidFormat { byte: u8, offset: usize },
    /// Decode: an ext type id with no registered unpacker in a
    /// registry built without the generic fallback.
    #[error("unknown ext type: 0x{0:02x}")]
    UnknownExtType(u8),
    /// Decode: a map key that is not a string.
    #[error("invalid map key")]
    InvalidKey,
    /// Decode: a string payload that is not valid CESU-8.
    #[error("invalid text payload")]
    InvalidText,
    /// Decode: an ext payload whose shape does not match its
    /// registered type (e.g. a typed-array payload of odd length).
    #[error("malformed payload for ext type 0x{0:02x}")]
    ExtPayload(u8),
    /// One-shot decode: the buffer ended before the first value
    /// completed.
    #[error("unexpected end of input")]
    UnexpectedEof,
}
