use std::sync::Arc;

use crate::buf::BufView;
use crate::code::{self, FormatCode};
use crate::element::{Element, pad_to_alignment};
use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackError, UnpackErrorKind,
    UnpackResult,
};
use crate::field::{FieldSpec, SpecArg};
use crate::mode::Mode;
use crate::value::{EnumMember, EnumType, Record, Value};

/// An enumeration field: a primitive integer on the wire, a member of a
/// closed [`EnumType`] in values.
///
/// Pack accepts a member, a member name, or a raw member value; anything
/// else in the type's domain is rejected. Unpack refuses integers with no
/// matching member.
#[derive(Debug, Clone)]
pub struct EnumElement {
    name: String,
    code: FormatCode,
    ty: Arc<EnumType>,
    mode: Mode,
    alignment: usize,
}

impl EnumElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        let [SpecArg::Fmt(fmt), SpecArg::Enum(_)] = spec.args() else {
            return false;
        };
        FormatCode::parse(fmt).is_some_and(|code| {
            !code.has_repeat() && "cbB?hHiIlLqQnN".contains(code.letter())
        })
    }

    pub(crate) fn build(
        spec: &FieldSpec,
        mode: Mode,
        alignment: usize,
    ) -> Result<Element, SchemaError> {
        let [SpecArg::Fmt(fmt), SpecArg::Enum(ty)] = spec.args() else {
            return Err(SchemaError::UnmatchedField(spec.name().to_string()));
        };
        let code = FormatCode::parse(fmt).ok_or_else(|| SchemaError::InvalidFormat {
            field: spec.name().to_string(),
            format: fmt.clone(),
        })?;
        Ok(Element::Enum(EnumElement {
            name: spec.name().to_string(),
            code,
            ty: Arc::clone(ty),
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

    pub(crate) fn ty(&self) -> &Arc<EnumType> {
        &self.ty
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

    /// Normalize a supplied value to a member of the referenced type.
    fn normalize(&self, value: &Value) -> PackResult<EnumMember> {
        match value {
            Value::Enum(member) => {
                if member.ty() == &self.ty {
                    Ok(member.clone())
                } else {
                    Err(PackError::new(PackErrorKind::EnumTypeMismatch {
                        field: self.name.clone(),
                        expected: self.ty.name().to_string(),
                        actual: member.ty().name().to_string(),
                    }))
                }
            }
            Value::Str(name) => self.ty.member(name).ok_or_else(|| {
                PackError::new(PackErrorKind::UnknownEnumName {
                    field: self.name.clone(),
                    name: name.clone(),
                    enum_name: self.ty.name().to_string(),
                })
            }),
            Value::Int(_) | Value::Uint(_) => {
                let raw = value.to_i128().ok_or_else(|| self.value_error(value))?;
                self.ty
                    .member_by_value(raw)
                    .ok_or_else(|| self.value_error(value))
            }
            _ => Err(PackError::new(PackErrorKind::WrongType {
                field: self.name.clone(),
                expected: "enum member",
            })),
        }
    }

    fn value_error(&self, value: &Value) -> PackError {
        PackError::new(PackErrorKind::UnknownEnumValue {
            field: self.name.clone(),
            value: value.to_i128().unwrap_or(i128::MAX),
            enum_name: self.ty.name().to_string(),
        })
    }

    pub(crate) fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let member = self.normalize(value)?;
        let raw = member.value();

        let fits = if self.code.is_signed() {
            code::int_fits(raw, self.code.bits())
        } else {
            u128::try_from(raw).is_ok_and(|v| code::uint_fits(v, self.code.bits()))
        };
        if !fits {
            return Err(PackError::new(PackErrorKind::IntOutOfRange {
                field: self.name.clone(),
                value: raw.to_string(),
                bits: self.code.bits(),
            }));
        }

        let start = buf.len();
        code::write_int(buf, raw, self.code.size(), self.mode.byte_order());
        pad_to_alignment(buf, start, self.alignment);
        Ok(())
    }

    pub(crate) fn unpack(&self, _partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let size = self.code.size();
        let chunk = view.read(code::padded_size(size, self.alignment))?;
        let bytes = &chunk[..size];
        let order = self.mode.byte_order();

        let raw = if self.code.is_signed() {
            code::read_int(bytes, order)
        } else {
            code::read_uint(bytes, order) as i128
        };
        let member = self.ty.member_by_value(raw).ok_or_else(|| {
            UnpackError::new(UnpackErrorKind::UnknownEnumValue {
                field: self.name.clone(),
                value: raw,
                enum_name: self.ty.name().to_string(),
                buffer: chunk.remaining(),
            })
        })?;
        Ok(Value::Enum(member))
    }

    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        Ok(Value::Enum(self.normalize(value)?))
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        Some(code::padded_size(self.code.size(), self.alignment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn element() -> (EnumElement, Arc<EnumType>) {
        let ty = EnumType::new("Kind", &[("one", 1), ("two", 2), ("three", 3)]);
        let spec = FieldSpec::enumeration("kind", "B", &ty);
        assert!(EnumElement::matches(&spec));
        match EnumElement::build(&spec, Mode::Native, 1).unwrap() {
            Element::Enum(e) => (e, ty),
            _ => unreachable!(),
        }
    }

    fn pack_one(elem: &EnumElement, value: Value) -> PackResult<Vec<u8>> {
        let mut values = Record::new();
        values.set("kind", value);
        let mut buf = Vec::new();
        elem.pack(&values, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn test_member_name_and_value_pack_identically() {
        let (elem, ty) = element();
        let member = ty.member("two").unwrap();
        let by_member = pack_one(&elem, Value::Enum(member)).unwrap();
        let by_name = pack_one(&elem, Value::Str("two".into())).unwrap();
        let by_value = pack_one(&elem, Value::Uint(2)).unwrap();
        assert_eq!(by_member, [0x02]);
        assert_eq!(by_member, by_name);
        assert_eq!(by_member, by_value);
    }

    #[test]
    fn test_unknown_name() {
        let (elem, _ty) = element();
        let err = pack_one(&elem, Value::Str("four".into())).unwrap_err();
        assert_eq!(
            err.kind(),
            &PackErrorKind::UnknownEnumName {
                field: "kind".to_string(),
                name: "four".to_string(),
                enum_name: "Kind".to_string(),
            }
        );
    }

    #[test]
    fn test_unpack_unknown_value_keeps_context() {
        let (elem, _ty) = element();
        let data = Bytes::from_static(&[0x09]);
        let mut view = BufView::new(&data);
        let err = elem.unpack(&Record::new(), &mut view).unwrap_err();
        assert_eq!(
            err.kind(),
            &UnpackErrorKind::UnknownEnumValue {
                field: "kind".to_string(),
                value: 9,
                enum_name: "Kind".to_string(),
                buffer: Bytes::from_static(&[0x09]),
            }
        );
    }

    #[test]
    fn test_make_normalizes_without_serializing() {
        let (elem, ty) = element();
        let mut values = Record::new();
        values.set("kind", Value::Uint(3));
        assert_eq!(
            elem.make(&values).unwrap(),
            Value::Enum(ty.member("three").unwrap())
        );
    }

    #[test]
    fn test_wrong_enum_type() {
        let (elem, _ty) = element();
        let other = EnumType::new("Other", &[("one", 1)]);
        let err = pack_one(&elem, Value::Enum(other.member("one").unwrap())).unwrap_err();
        assert_eq!(
            err.kind(),
            &PackErrorKind::EnumTypeMismatch {
                field: "kind".to_string(),
                expected: "Kind".to_string(),
                actual: "Other".to_string(),
            }
        );
    }
}
