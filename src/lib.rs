//! Byteform is a binary message definition and codec library: a schema is
//! an ordered list of field specifications, and a [`Message`] built from it
//! packs structured values into bytes, unpacks bytes back into values, and
//! canonicalizes values without serializing.
//!
//! Fields may be primitives, enumerations, fixed-point numbers, or
//! variable-length runs of nested messages whose extent is resolved by
//! referencing a sibling field. Byte order and alignment are configured per
//! message and propagate into every nested message.
//!
//! # Examples
//!
//! ```
//! use byteform::{FieldSpec, Message, Mode, Record, Value};
//!
//! let item = Message::new(
//!     "Item",
//!     &[FieldSpec::format("x", "B"), FieldSpec::format("y", "B")],
//!     Mode::LittleEndian,
//! )
//! .unwrap();
//!
//! let packet = Message::new(
//!     "Packet",
//!     &[
//!         FieldSpec::length("count", "H", "items"),
//!         FieldSpec::variable("items", &item, "count"),
//!     ],
//!     Mode::LittleEndian,
//! )
//! .unwrap();
//! packet.validate().unwrap();
//!
//! let values = Record::from_iter([
//!     ("items",
//!      Value::List(vec![
//!          Value::Record(Record::from_iter([("x", 1u8), ("y", 2u8)])),
//!          Value::Record(Record::from_iter([("x", 3u8), ("y", 4u8)])),
//!      ])),
//! ]);
//!
//! let packed = packet.pack(&values).unwrap();
//! assert_eq!(&packed[..], &[0x02, 0x00, 0x01, 0x02, 0x03, 0x04]);
//!
//! let record = packet.unpack(&packed).unwrap();
//! assert_eq!(record["count"], Value::Uint(2));
//! ```

mod buf;
mod code;
mod codegen;
mod element;
mod error;
mod field;
mod message;
mod mode;
mod value;

pub use crate::buf::BufView;
pub use crate::code::{CodeKind, FormatCode};
pub use crate::codegen::DeclContext;
pub use crate::element::{
    DiscriminatedElement, Element, EnumElement, FixedPointElement, LengthElement, LengthUnit,
    Registry, ScalarElement, StringElement, VarRef, VariableElement,
};
pub use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackError, UnpackErrorKind,
    UnpackResult,
};
pub use crate::field::{FieldSpec, SpecArg};
pub use crate::message::Message;
pub use crate::mode::Mode;
pub use crate::value::{EnumMember, EnumType, Record, Value};
