use crate::buf::BufView;
use crate::code::{self, CodeKind, FormatCode};
use crate::element::{Element, pad_to_alignment};
use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackResult,
};
use crate::field::{FieldSpec, SpecArg};
use crate::mode::Mode;
use crate::value::{Record, Value};

/// A primitive field: one integer, float, bool, or pointer-sized value.
///
/// Integer codes accept a repeat prefix, which widens the field: `"2H"` is a
/// single integer occupying four bytes in the message byte order, not two
/// separate values.
#[derive(Debug, Clone)]
pub struct ScalarElement {
    name: String,
    code: FormatCode,
    mode: Mode,
    alignment: usize,
}

impl ScalarElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        let [SpecArg::Fmt(fmt)] = spec.args() else {
            return false;
        };
        let Some(code) = FormatCode::parse(fmt) else {
            return false;
        };
        match code.letter() {
            'b' | 'B' | 'h' | 'H' | 'i' | 'I' | 'l' | 'L' | 'q' | 'Q' => code.size() <= 16,
            '?' | 'n' | 'N' | 'f' | 'd' | 'P' => !code.has_repeat(),
            _ => false,
        }
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
        Ok(Element::Scalar(ScalarElement {
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
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let start = buf.len();
        let order = self.mode.byte_order();

        match self.code.kind() {
            CodeKind::SignedInt => {
                let v = value.to_i128().ok_or_else(|| self.wrong_type("integer"))?;
                if !code::int_fits(v, self.code.bits()) {
                    return Err(self.out_of_range(v.to_string()));
                }
                code::write_int(buf, v, self.code.size(), order);
            }
            CodeKind::UnsignedInt => {
                let v = value
                    .to_u128()
                    .ok_or_else(|| self.wrong_type("unsigned integer"))?;
                if !code::uint_fits(v, self.code.bits()) {
                    return Err(self.out_of_range(v.to_string()));
                }
                code::write_uint(buf, v, self.code.size(), order);
            }
            CodeKind::Bool => {
                let Value::Bool(b) = value else {
                    return Err(self.wrong_type("bool"));
                };
                buf.push(u8::from(*b));
            }
            CodeKind::Float => {
                let v = self.float_input(value)?;
                if self.code.letter() == 'f' {
                    code::write_uint(buf, u128::from((v as f32).to_bits()), 4, order);
                } else {
                    code::write_uint(buf, u128::from(v.to_bits()), 8, order);
                }
            }
            _ => unreachable!("scalar classification admits no text codes"),
        }

        pad_to_alignment(buf, start, self.alignment);
        Ok(())
    }

    pub(crate) fn unpack(&self, _partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let size = self.code.size();
        let chunk = view.read(code::padded_size(size, self.alignment))?;
        let bytes = &chunk[..size];
        let order = self.mode.byte_order();

        let value = match self.code.kind() {
            CodeKind::SignedInt => Value::Int(code::read_int(bytes, order)),
            CodeKind::UnsignedInt => Value::Uint(code::read_uint(bytes, order)),
            CodeKind::Bool => Value::Bool(bytes[0] != 0),
            CodeKind::Float => {
                if self.code.letter() == 'f' {
                    Value::Float(f64::from(f32::from_bits(
                        code::read_uint(bytes, order) as u32
                    )))
                } else {
                    Value::Float(f64::from_bits(code::read_uint(bytes, order) as u64))
                }
            }
            _ => unreachable!("scalar classification admits no text codes"),
        };
        Ok(value)
    }

    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let value = match self.code.kind() {
            CodeKind::SignedInt => {
                Value::Int(value.to_i128().ok_or_else(|| self.wrong_type("integer"))?)
            }
            CodeKind::UnsignedInt => Value::Uint(
                value
                    .to_u128()
                    .ok_or_else(|| self.wrong_type("unsigned integer"))?,
            ),
            CodeKind::Bool => {
                let Value::Bool(b) = value else {
                    return Err(self.wrong_type("bool"));
                };
                Value::Bool(*b)
            }
            CodeKind::Float => Value::Float(self.float_input(value)?),
            _ => unreachable!("scalar classification admits no text codes"),
        };
        Ok(value)
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        Some(code::padded_size(self.code.size(), self.alignment))
    }

    fn float_input(&self, value: &Value) -> PackResult<f64> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Uint(u) => Ok(*u as f64),
            _ => Err(self.wrong_type("float")),
        }
    }

    fn wrong_type(&self, expected: &'static str) -> PackError {
        PackError::new(PackErrorKind::WrongType {
            field: self.name.clone(),
            expected,
        })
    }

    fn out_of_range(&self, value: String) -> PackError {
        PackError::new(PackErrorKind::IntOutOfRange {
            field: self.name.clone(),
            value,
            bits: self.code.bits(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn scalar(fmt: &str, mode: Mode, alignment: usize) -> ScalarElement {
        let spec = FieldSpec::format("v", fmt);
        assert!(ScalarElement::matches(&spec));
        match ScalarElement::build(&spec, mode, alignment).unwrap() {
            Element::Scalar(e) => e,
            _ => unreachable!(),
        }
    }

    fn pack_one(elem: &ScalarElement, value: Value) -> Vec<u8> {
        let mut values = Record::new();
        values.set("v", value);
        let mut buf = Vec::new();
        elem.pack(&values, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_pack_unpack_endianness() {
        let elem = scalar("H", Mode::BigEndian, 1);
        assert_eq!(pack_one(&elem, Value::Uint(0x0102)), [0x01, 0x02]);

        let elem = scalar("H", Mode::LittleEndian, 1);
        assert_eq!(pack_one(&elem, Value::Uint(0x0102)), [0x02, 0x01]);

        let data = Bytes::from_static(&[0x02, 0x01]);
        let mut view = BufView::new(&data);
        let value = elem.unpack(&Record::new(), &mut view).unwrap();
        assert_eq!(value, Value::Uint(0x0102));
        assert!(view.is_empty());
    }

    #[test]
    fn test_repeat_join_matches_wide_code() {
        // "2H" is one 4-byte integer, byte-identical to "I" in either order.
        for mode in [Mode::LittleEndian, Mode::BigEndian] {
            let joined = scalar("2H", mode, 1);
            let wide = scalar("I", mode, 1);
            assert_eq!(
                pack_one(&joined, Value::Uint(0x01020304)),
                pack_one(&wide, Value::Uint(0x01020304)),
            );
        }
    }

    #[test]
    fn test_alignment_padding() {
        let elem = scalar("H", Mode::LittleEndian, 4);
        let buf = pack_one(&elem, Value::Uint(1));
        assert_eq!(buf, [0x01, 0x00, 0x00, 0x00]);
        assert_eq!(elem.byte_size(), Some(4));

        let data = Bytes::from_static(&[0x01, 0x00, 0xAA, 0xBB, 0x07]);
        let mut view = BufView::new(&data);
        let value = elem.unpack(&Record::new(), &mut view).unwrap();
        assert_eq!(value, Value::Uint(1));
        // The two padding bytes are skipped along with the layout.
        assert_eq!(&*view, &[0x07]);
    }

    #[test]
    fn test_signed_range() {
        let elem = scalar("b", Mode::Native, 1);
        assert_eq!(pack_one(&elem, Value::Int(-1)), [0xFF]);

        let mut values = Record::new();
        values.set("v", Value::Int(200));
        let mut buf = Vec::new();
        let err = elem.pack(&values, &mut buf).unwrap_err();
        assert_eq!(
            err.kind(),
            &PackErrorKind::IntOutOfRange {
                field: "v".to_string(),
                value: "200".to_string(),
                bits: 8,
            }
        );
    }

    #[test]
    fn test_floats_roundtrip() {
        for fmt in ["f", "d"] {
            let elem = scalar(fmt, Mode::BigEndian, 1);
            let buf = Bytes::from(pack_one(&elem, Value::Float(1.5)));
            let mut view = BufView::new(&buf);
            assert_eq!(
                elem.unpack(&Record::new(), &mut view).unwrap(),
                Value::Float(1.5)
            );
        }
    }

    #[test]
    fn test_missing_field() {
        let elem = scalar("B", Mode::Native, 1);
        let err = elem.pack(&Record::new(), &mut Vec::new()).unwrap_err();
        assert_eq!(
            err.kind(),
            &PackErrorKind::MissingField("v".to_string())
        );
    }
}
