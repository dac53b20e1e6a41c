use crate::buf::BufView;
use crate::code::{self, FormatCode};
use crate::element::{self, Element, pad_to_alignment};
use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackResult,
};
use crate::field::{FieldSpec, SpecArg};
use crate::mode::Mode;
use crate::value::{Record, Value};

/// What a length field measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    /// The number of nested records in the described variable field.
    Records,
    /// A byte budget for the described variable field.
    Bytes,
}

/// An unsigned integer field designated as the count or byte-budget source
/// for a specific variable field.
///
/// With [`LengthUnit::Records`] the packed value is always the length of
/// the described field's record list; whatever the caller supplied under
/// this field's own name is ignored. With [`LengthUnit::Bytes`] the
/// caller-supplied budget is packed as given.
#[derive(Debug, Clone)]
pub struct LengthElement {
    name: String,
    code: FormatCode,
    of: String,
    unit: LengthUnit,
    mode: Mode,
    alignment: usize,
}

impl LengthElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        let [SpecArg::Fmt(fmt), SpecArg::Ref(_) | SpecArg::ByteRef(_)] = spec.args() else {
            return false;
        };
        FormatCode::parse(fmt)
            .is_some_and(|code| !code.has_repeat() && "BHILQ".contains(code.letter()))
    }

    pub(crate) fn build(
        spec: &FieldSpec,
        mode: Mode,
        alignment: usize,
    ) -> Result<Element, SchemaError> {
        let (fmt, of, unit) = match spec.args() {
            [SpecArg::Fmt(fmt), SpecArg::Ref(of)] => (fmt, of, LengthUnit::Records),
            [SpecArg::Fmt(fmt), SpecArg::ByteRef(of)] => (fmt, of, LengthUnit::Bytes),
            _ => return Err(SchemaError::UnmatchedField(spec.name().to_string())),
        };
        let code = FormatCode::parse(fmt).ok_or_else(|| SchemaError::InvalidFormat {
            field: spec.name().to_string(),
            format: fmt.clone(),
        })?;
        Ok(Element::Length(LengthElement {
            name: spec.name().to_string(),
            code,
            of: of.clone(),
            unit,
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

    /// The variable field this element describes.
    pub(crate) fn of(&self) -> &str {
        &self.of
    }

    pub(crate) fn unit(&self) -> LengthUnit {
        self.unit
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    pub(crate) fn validate(&self, siblings: &[Element]) -> Result<(), ConfigError> {
        let target = element::find(siblings, &self.of).ok_or_else(|| {
            ConfigError::UnknownReference {
                field: self.name.clone(),
                target: self.of.clone(),
            }
        })?;
        let Element::Variable(variable) = target else {
            return Err(ConfigError::NotAVariable {
                field: self.name.clone(),
                target: self.of.clone(),
            });
        };
        let (back_ref, unit) = match variable.reference() {
            super::VarRef::Count(name) => (name, LengthUnit::Records),
            super::VarRef::Size(name) => (name, LengthUnit::Bytes),
            super::VarRef::Fixed(_) => {
                return Err(ConfigError::ReferenceMismatch {
                    field: self.name.clone(),
                    target: self.of.clone(),
                    actual: "a fixed repeat count".to_string(),
                });
            }
        };
        if back_ref != &self.name {
            return Err(ConfigError::ReferenceMismatch {
                field: self.name.clone(),
                target: self.of.clone(),
                actual: format!("{back_ref:?}"),
            });
        }
        if unit != self.unit {
            return Err(ConfigError::UnitMismatch {
                field: self.name.clone(),
                target: self.of.clone(),
            });
        }
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

    fn resolve(&self, values: &Record) -> PackResult<u128> {
        match self.unit {
            LengthUnit::Records => {
                let list = values
                    .get(&self.of)
                    .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.of.clone())))?;
                let list = list.as_list().ok_or_else(|| {
                    PackError::new(PackErrorKind::WrongType {
                        field: self.of.clone(),
                        expected: "list",
                    })
                })?;
                Ok(list.len() as u128)
            }
            LengthUnit::Bytes => {
                let value = values
                    .get(&self.name)
                    .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
                value.to_u128().ok_or_else(|| {
                    PackError::new(PackErrorKind::WrongType {
                        field: self.name.clone(),
                        expected: "unsigned integer",
                    })
                })
            }
        }
    }

    pub(crate) fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        let value = self.resolve(values)?;
        if !code::uint_fits(value, self.code.bits()) {
            return Err(PackError::new(PackErrorKind::IntOutOfRange {
                field: self.name.clone(),
                value: value.to_string(),
                bits: self.code.bits(),
            }));
        }
        let start = buf.len();
        code::write_uint(buf, value, self.code.size(), self.mode.byte_order());
        pad_to_alignment(buf, start, self.alignment);
        Ok(())
    }

    pub(crate) fn unpack(&self, _partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let size = self.code.size();
        let chunk = view.read(code::padded_size(size, self.alignment))?;
        Ok(Value::Uint(code::read_uint(
            &chunk[..size],
            self.mode.byte_order(),
        )))
    }

    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        Ok(Value::Uint(self.resolve(values)?))
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        Some(code::padded_size(self.code.size(), self.alignment))
    }
}
