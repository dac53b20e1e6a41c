use bytes::Bytes;
use thiserror::Error;

/// Errors raised while building a [`crate::Message`] from field
/// specifications: names that cannot be used, specs no element type claims,
/// or extra slots that a matching element type rejects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("duplicate field {0:?}")]
    DuplicateField(String),

    #[error("no element type matches field {0:?}")]
    UnmatchedField(String),

    #[error("field {field:?} has invalid format code {format:?}")]
    InvalidFormat { field: String, format: String },

    #[error("field {field:?}: precision {precision} exceeds the {bits} bits of format {format:?}")]
    PrecisionTooLarge {
        field: String,
        format: String,
        precision: u32,
        bits: u32,
    },

    #[error("field {field:?} has invalid repeat count {count}")]
    InvalidRepeatCount { field: String, count: i64 },
}

/// Cross-field reference integrity failures, reported by
/// [`crate::Message::validate`] before a schema is first used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field {field:?} references unknown field {target:?}")]
    UnknownReference { field: String, target: String },

    #[error("variable field {field:?} references {target:?}, which is not a length field")]
    NotALength { field: String, target: String },

    #[error("length field {field:?} describes {target:?}, which is not a variable field")]
    NotAVariable { field: String, target: String },

    #[error("field {field:?} references {target:?}, but {target:?} describes {actual:?}")]
    ReferenceMismatch {
        field: String,
        target: String,
        actual: String,
    },

    #[error("length field {field:?} and variable field {target:?} disagree on the counting unit")]
    UnitMismatch { field: String, target: String },

    #[error("discriminated field {field:?} references {target:?}, which is not an enum field")]
    NotAnEnum { field: String, target: String },

    #[error("discriminated field {field:?} key {value} is not a member of {enum_name}")]
    InvalidArmKey {
        field: String,
        value: i128,
        enum_name: String,
    },
}

/// Specific kinds of failures that can occur while packing or making values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackErrorKind {
    #[error("missing field {0:?}")]
    MissingField(String),

    #[error("field {field:?} expects a {expected} value")]
    WrongType { field: String, expected: &'static str },

    #[error("field {field:?}: value {value} does not fit in {bits} bits")]
    IntOutOfRange {
        field: String,
        value: String,
        bits: u32,
    },

    #[error("{name:?} is not a member name of {enum_name}")]
    UnknownEnumName {
        field: String,
        name: String,
        enum_name: String,
    },

    #[error("{value} is not a member value of {enum_name}")]
    UnknownEnumValue {
        field: String,
        value: i128,
        enum_name: String,
    },

    #[error("field {field:?} expects a member of {expected}, got one of {actual}")]
    EnumTypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("field {field:?}: {value:?} is not a decimal value")]
    NotDecimal { field: String, value: String },

    #[error(
        "field {field:?}: {value} does not fit in {integer_bits} integer bits \
         ({precision} bits are reserved for the fraction)"
    )]
    FixedPointRange {
        field: String,
        value: String,
        integer_bits: u32,
        precision: u32,
    },

    #[error("field {field:?}: {len} bytes exceed the field width of {width}")]
    StringTooLong {
        field: String,
        len: usize,
        width: usize,
    },

    #[error("field {field:?}: repeated format has no fixed size to pad empty slots with")]
    IndeterminateSize { field: String },

    #[error("field {field:?}: no format arm for discriminant value {value}")]
    InvalidDiscriminant { field: String, value: i128 },
}

/// Error type returned when packing values into bytes fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pack error: {kind}")]
pub struct PackError {
    kind: PackErrorKind,
}

impl PackError {
    /// Creates a new PackError with the given kind.
    pub const fn new(kind: PackErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the specific kind of pack error that occurred.
    pub fn kind(&self) -> &PackErrorKind {
        &self.kind
    }
}

/// Result type for pack and make operations.
pub type PackResult<T> = Result<T, PackError>;

/// Specific kinds of failures that can occur while unpacking bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnpackErrorKind {
    #[error("buffer truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("buffer not fully used by unpack: {bytes_remaining} bytes remaining")]
    TrailingBytes { bytes_remaining: usize },

    #[error(
        "field {field:?}: {value} is not a member value of {enum_name} (decoded from {buffer:?})"
    )]
    UnknownEnumValue {
        field: String,
        value: i128,
        enum_name: String,
        buffer: Bytes,
    },

    #[error("field {field:?} references {reference:?}, which has not been unpacked yet")]
    MissingReference { field: String, reference: String },

    #[error("field {field:?} references {reference:?}, which did not unpack to a usable number")]
    InvalidReference { field: String, reference: String },

    #[error("field {field:?}: invalid UTF-8 in string")]
    InvalidString { field: String },

    #[error("field {field:?}: no format arm for discriminant value {value}")]
    InvalidDiscriminant { field: String, value: i128 },
}

/// Error type returned when unpacking binary data fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unpack error: {kind}")]
pub struct UnpackError {
    kind: UnpackErrorKind,
}

impl UnpackError {
    /// Creates a new UnpackError with the given kind.
    pub const fn new(kind: UnpackErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the specific kind of unpack error that occurred.
    pub fn kind(&self) -> &UnpackErrorKind {
        &self.kind
    }
}

/// Result type for unpack operations.
pub type UnpackResult<T> = Result<T, UnpackError>;
