use bytes::Bytes;

use crate::buf::BufView;
use crate::element::{Element, Registry};
use crate::error::{
    ConfigError, PackResult, SchemaError, UnpackError, UnpackErrorKind, UnpackResult,
};
use crate::field::FieldSpec;
use crate::mode::Mode;
use crate::value::Record;

/// An ordered schema of elements forming one record.
///
/// Element order is wire order, and it is the order in which cross-field
/// references become available while unpacking: a variable-length field may
/// only depend on fields declared before it. A message can itself serve as
/// the repeated unit of a variable field, nesting schemas to any depth.
#[derive(Debug, Clone)]
pub struct Message {
    name: String,
    elements: Vec<Element>,
    mode: Mode,
    alignment: usize,
}

impl Message {
    /// Build a message from field specifications with the standard element
    /// registry and an alignment of one.
    pub fn new(name: &str, fields: &[FieldSpec], mode: Mode) -> Result<Self, SchemaError> {
        Message::with_registry(Registry::standard(), name, fields, mode, 1)
    }

    /// Build a message padding every element to `alignment` bytes.
    pub fn with_alignment(
        name: &str,
        fields: &[FieldSpec],
        mode: Mode,
        alignment: usize,
    ) -> Result<Self, SchemaError> {
        Message::with_registry(Registry::standard(), name, fields, mode, alignment)
    }

    /// Build a message classifying fields against a caller-supplied
    /// registry.
    pub fn with_registry(
        registry: &Registry,
        name: &str,
        fields: &[FieldSpec],
        mode: Mode,
        alignment: usize,
    ) -> Result<Self, SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::InvalidName(name.to_string()));
        }

        let mut elements: Vec<Element> = Vec::with_capacity(fields.len());
        for spec in fields {
            if spec.name().is_empty() {
                return Err(SchemaError::InvalidName(spec.name().to_string()));
            }
            if elements.iter().any(|e| e.name() == spec.name()) {
                return Err(SchemaError::DuplicateField(spec.name().to_string()));
            }
            elements.push(registry.classify(spec, mode, alignment)?);
        }

        Ok(Message {
            name: name.to_string(),
            elements,
            mode,
            alignment,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Check cross-field reference integrity for every element. Callers
    /// are expected to run this once before first use of the schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for element in &self.elements {
            element.validate(&self.elements)?;
        }
        Ok(())
    }

    /// Change the byte-order mode and/or alignment, cascading into every
    /// nested message reachable through variable and discriminated fields.
    pub fn update(&mut self, mode: Option<Mode>, alignment: Option<usize>) {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(alignment) = alignment {
            self.alignment = alignment;
        }
        for element in &mut self.elements {
            element.update(mode, alignment);
        }
    }

    /// Pack `values` into bytes, element by element in schema order.
    pub fn pack(&self, values: &Record) -> PackResult<Bytes> {
        let mut buf = Vec::new();
        self.pack_into(values, &mut buf)?;
        Ok(Bytes::from(buf))
    }

    pub(crate) fn pack_into(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        for element in &self.elements {
            element.pack(values, buf)?;
        }
        Ok(())
    }

    /// Unpack a complete message; trailing bytes are an error.
    pub fn unpack(&self, buf: &Bytes) -> UnpackResult<Record> {
        let mut view = BufView::new(buf);
        let record = self.unpack_into(&mut view)?;
        if !view.is_empty() {
            return Err(UnpackError::new(UnpackErrorKind::TrailingBytes {
                bytes_remaining: view.len(),
            }));
        }
        Ok(record)
    }

    /// Unpack a message from the front of `buf`, returning the decoded
    /// record together with the unused remainder.
    pub fn unpack_partial(&self, buf: &Bytes) -> UnpackResult<(Record, Bytes)> {
        let mut view = BufView::new(buf);
        let record = self.unpack_into(&mut view)?;
        Ok((record, view.remaining()))
    }

    pub(crate) fn unpack_into(&self, view: &mut BufView<'_>) -> UnpackResult<Record> {
        let mut record = Record::new();
        for element in &self.elements {
            let value = element.unpack(&record, view)?;
            record.set(element.name(), value);
        }
        Ok(record)
    }

    /// Produce the canonicalized in-memory record for `values` without
    /// serializing.
    pub fn make(&self, values: &Record) -> PackResult<Record> {
        let mut record = Record::new();
        for element in &self.elements {
            record.set(element.name(), element.make(values)?);
        }
        Ok(record)
    }

    /// The fixed wire size of this message, if no element's size depends
    /// on values.
    pub fn byte_size(&self) -> Option<usize> {
        self.elements.iter().map(Element::byte_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::value::Value;

    fn point() -> Message {
        Message::new(
            "Point",
            &[FieldSpec::format("x", "B"), FieldSpec::format("y", "B")],
            Mode::Native,
        )
        .unwrap()
    }

    #[test]
    fn test_schema_errors() {
        assert_eq!(
            Message::new("", &[], Mode::Native).unwrap_err(),
            SchemaError::InvalidName(String::new())
        );
        assert_eq!(
            Message::new(
                "M",
                &[FieldSpec::format("x", "B"), FieldSpec::format("x", "B")],
                Mode::Native,
            )
            .unwrap_err(),
            SchemaError::DuplicateField("x".to_string())
        );
        assert_eq!(
            Message::new("M", &[FieldSpec::format("x", "@@")], Mode::Native).unwrap_err(),
            SchemaError::UnmatchedField("x".to_string())
        );
    }

    #[test]
    fn test_pack_unpack_in_schema_order() {
        let msg = Message::new(
            "Pair",
            &[FieldSpec::format("a", "B"), FieldSpec::format("b", "H")],
            Mode::BigEndian,
        )
        .unwrap();

        let values = Record::from_iter([("a", Value::Uint(1)), ("b", Value::Uint(0x0203))]);
        let packed = msg.pack(&values).unwrap();
        assert_eq!(&packed[..], &[0x01, 0x02, 0x03]);

        let record = msg.unpack(&packed).unwrap();
        assert_eq!(record["a"], Value::Uint(1));
        assert_eq!(record["b"], Value::Uint(0x0203));
    }

    #[test]
    fn test_unpack_rejects_trailing_bytes() {
        let msg = point();
        let buf = Bytes::from_static(&[1, 2, 3]);
        let err = msg.unpack(&buf).unwrap_err();
        assert_eq!(
            err.kind(),
            &UnpackErrorKind::TrailingBytes { bytes_remaining: 1 }
        );
    }

    #[test]
    fn test_unpack_partial_returns_remainder() {
        let msg = point();
        let buf = Bytes::from_static(&[1, 2, 3, 4]);
        let (record, rest) = msg.unpack_partial(&buf).unwrap();
        assert_eq!(record["x"], Value::Uint(1));
        assert_eq!(record["y"], Value::Uint(2));
        assert_eq!(rest, Bytes::from_static(&[3, 4]));
    }

    #[test]
    fn test_truncated_buffer() {
        let msg = Message::new("M", &[FieldSpec::format("v", "I")], Mode::Native).unwrap();
        let buf = Bytes::from_static(&[1, 2]);
        let err = msg.unpack(&buf).unwrap_err();
        assert_eq!(
            err.kind(),
            &UnpackErrorKind::Truncated {
                needed: 4,
                available: 2
            }
        );
    }

    #[test]
    fn test_make_canonicalizes() {
        let msg = point();
        let values = Record::from_iter([("x", Value::Int(1)), ("y", Value::Uint(2))]);
        let made = msg.make(&values).unwrap();
        assert_eq!(made["x"], Value::Uint(1));
        assert_eq!(made["y"], Value::Uint(2));
    }

    #[test]
    fn test_byte_size() {
        let msg = Message::new(
            "M",
            &[FieldSpec::format("a", "B"), FieldSpec::format("b", "H")],
            Mode::Native,
        )
        .unwrap();
        assert_eq!(msg.byte_size(), Some(3));

        let outer = Message::new(
            "Outer",
            &[
                FieldSpec::length("count", "H", "items"),
                FieldSpec::variable("items", &point(), "count"),
            ],
            Mode::Native,
        )
        .unwrap();
        assert_eq!(outer.byte_size(), None);
    }

    #[test]
    fn test_alignment_applies_to_all_elements() {
        let msg = Message::with_alignment(
            "M",
            &[FieldSpec::format("a", "B"), FieldSpec::format("b", "H")],
            Mode::LittleEndian,
            4,
        )
        .unwrap();
        let values = Record::from_iter([("a", Value::Uint(1)), ("b", Value::Uint(2))]);
        let packed = msg.pack(&values).unwrap();
        assert_eq!(
            &packed[..],
            &[0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]
        );
        let record = msg.unpack(&packed).unwrap();
        assert_eq!(record["b"], Value::Uint(2));
    }
}
