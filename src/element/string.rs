use crate::buf::BufView;
use crate::code::{self, CodeKind, FormatCode};
use crate::element::{Element, pad_to_alignment};
use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackError, UnpackErrorKind,
    UnpackResult,
};
use crate::field::{FieldSpec, SpecArg};
use crate::mode::Mode;
use crate::value::{Record, Value};

/// A text field: a fixed-width byte string (`s`), a Pascal-style string
/// with a leading length byte (`p`), or a run of single chars (`c`).
///
/// Values shorter than the field width are NUL-padded on pack. `s` strips
/// the padding again on unpack; `p` and `c` keep it.
#[derive(Debug, Clone)]
pub struct StringElement {
    name: String,
    code: FormatCode,
    mode: Mode,
    alignment: usize,
}

impl StringElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        let [SpecArg::Fmt(fmt)] = spec.args() else {
            return false;
        };
        FormatCode::parse(fmt)
            .is_some_and(|code| matches!(code.letter(), 'c' | 's' | 'p'))
    }

    pub(crate) fn build(
        spec: &FieldSpec,
        mode: Mode,
        alignment: usize,
    ) -> Result<Element, SchemaError> {
        let [SpecArg::Fmt(fmt)] = spec.args() else {
            return Err(SchemaError::UnmatchedField(spec.name().to_string()));
        };
        let code = FormatCode::parse(fmt).ok_or_else(|| SchemaError::InvalidFormat {
            field: spec.name().to_string(),
            format: fmt.clone(),
        })?;
        Ok(Element::String(StringElement {
            name: spec.name().to_string(),
            code,
            mode,
            alignment,
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn code(&self) -> &FormatCode {
        &self.code
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    /// The field width in bytes, length byte included for `p`.
    fn width(&self) -> usize {
        self.code.size()
    }

    /// How many content bytes a value may occupy.
    fn capacity(&self) -> usize {
        match self.code.kind() {
            CodeKind::Pascal => self.width().saturating_sub(1),
            _ => self.width(),
        }
    }

    pub(crate) fn validate(&self, _siblings: &[Element]) -> Result<(), ConfigError> {
        Ok(())
    }

    pub(crate) fn update(&mut self, mode: Option<Mode>, alignment: Option<usize>) {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(alignment) = alignment {
            self.alignment = alignment;
        }
    }

    pub(crate) fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        let bytes = self.bytes_input(values)?;
        let start = buf.len();

        if self.code.kind() == CodeKind::Pascal {
            // The stored length always claims the full capacity; the
            // content is NUL-padded out to it.
            buf.push(self.capacity().min(255) as u8);
        }
        buf.extend_from_slice(&bytes);
        buf.resize(start + self.width(), 0);

        pad_to_alignment(buf, start, self.alignment);
        Ok(())
    }

    pub(crate) fn unpack(&self, _partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let width = self.width();
        let chunk = view.read(code::padded_size(width, self.alignment))?;
        let bytes = &chunk[..width];

        let content = match self.code.kind() {
            CodeKind::Bytes => {
                let end = bytes
                    .iter()
                    .rposition(|&b| b != 0)
                    .map_or(0, |pos| pos + 1);
                &bytes[..end]
            }
            CodeKind::Pascal => {
                let stored = usize::from(bytes[0]);
                &bytes[1..1 + stored.min(width - 1)]
            }
            CodeKind::Char => bytes,
            _ => unreachable!("string classification admits only c, s, p"),
        };

        let text = std::str::from_utf8(content).map_err(|_| {
            UnpackError::new(UnpackErrorKind::InvalidString {
                field: self.name.clone(),
            })
        })?;
        Ok(Value::Str(text.to_string()))
    }

    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        let bytes = self.bytes_input(values)?;
        let mut text = String::from_utf8(bytes).map_err(|_| {
            PackError::new(PackErrorKind::WrongType {
                field: self.name.clone(),
                expected: "string",
            })
        })?;
        // Pascal and char fields canonicalize to their exact width.
        if matches!(self.code.kind(), CodeKind::Pascal | CodeKind::Char) {
            while text.len() < self.width() {
                text.push('\0');
            }
        }
        Ok(Value::Str(text))
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        Some(code::padded_size(self.width(), self.alignment))
    }

    fn bytes_input(&self, values: &Record) -> PackResult<Vec<u8>> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let bytes = match value {
            Value::Str(s) => s.as_bytes().to_vec(),
            Value::Bytes(b) => b.to_vec(),
            _ => {
                return Err(PackError::new(PackErrorKind::WrongType {
                    field: self.name.clone(),
                    expected: "string",
                }));
            }
        };
        if bytes.len() > self.capacity() {
            return Err(PackError::new(PackErrorKind::StringTooLong {
                field: self.name.clone(),
                len: bytes.len(),
                width: self.capacity(),
            }));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn string(fmt: &str) -> StringElement {
        let spec = FieldSpec::format("s", fmt);
        assert!(StringElement::matches(&spec));
        match StringElement::build(&spec, Mode::Native, 1).unwrap() {
            Element::String(e) => e,
            _ => unreachable!(),
        }
    }

    fn pack_one(elem: &StringElement, value: Value) -> Vec<u8> {
        let mut values = Record::new();
        values.set("s", value);
        let mut buf = Vec::new();
        elem.pack(&values, &mut buf).unwrap();
        buf
    }

    fn unpack_one(elem: &StringElement, bytes: &[u8]) -> Value {
        let data = Bytes::copy_from_slice(bytes);
        let mut view = BufView::new(&data);
        let value = elem.unpack(&Record::new(), &mut view).unwrap();
        assert!(view.is_empty());
        value
    }

    #[test]
    fn test_fixed_bytes_pad_and_strip() {
        let elem = string("6s");
        let buf = pack_one(&elem, Value::Str("abc".into()));
        assert_eq!(buf, b"abc\0\0\0");
        assert_eq!(unpack_one(&elem, &buf), Value::Str("abc".into()));
    }

    #[test]
    fn test_pascal_keeps_padding() {
        let elem = string("6p");
        let buf = pack_one(&elem, Value::Str("ab".into()));
        assert_eq!(buf, b"\x05ab\0\0\0");
        // The stored length claims the full capacity, so the NUL padding
        // survives the round trip.
        assert_eq!(unpack_one(&elem, &buf), Value::Str("ab\0\0\0".into()));
    }

    #[test]
    fn test_char_run() {
        let elem = string("4c");
        let buf = pack_one(&elem, Value::Str("hi".into()));
        assert_eq!(buf, b"hi\0\0");
        assert_eq!(unpack_one(&elem, &buf), Value::Str("hi\0\0".into()));
    }

    #[test]
    fn test_too_long() {
        let elem = string("2s");
        let mut values = Record::new();
        values.set("s", "abc");
        let err = elem.pack(&values, &mut Vec::new()).unwrap_err();
        assert_eq!(
            err.kind(),
            &PackErrorKind::StringTooLong {
                field: "s".to_string(),
                len: 3,
                width: 2,
            }
        );
    }

    #[test]
    fn test_make_pads_pascal() {
        let elem = string("4p");
        let mut values = Record::new();
        values.set("s", "a");
        assert_eq!(
            elem.make(&values).unwrap(),
            Value::Str("a\0\0\0".into())
        );
    }
}
