use crate::buf::BufView;
use crate::element::{self, Element};
use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackError, UnpackErrorKind,
    UnpackResult,
};
use crate::field::{FieldSpec, SpecArg};
use crate::message::Message;
use crate::mode::Mode;
use crate::value::{Record, Value};

/// A union-style field whose format is selected by the value of a sibling
/// enum field.
///
/// Each arm maps one member value of the referenced enumeration to a
/// nested message, or to nothing: an armless discriminant contributes no
/// bytes and unpacks to [`Value::Null`].
#[derive(Debug, Clone)]
pub struct DiscriminatedElement {
    name: String,
    arms: Vec<(i128, Option<Message>)>,
    of: String,
    mode: Mode,
    alignment: usize,
}

impl DiscriminatedElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        matches!(spec.args(), [SpecArg::Arms(_), SpecArg::Ref(_)])
    }

    pub(crate) fn build(
        spec: &FieldSpec,
        mode: Mode,
        alignment: usize,
    ) -> Result<Element, SchemaError> {
        let [SpecArg::Arms(arms), SpecArg::Ref(of)] = spec.args() else {
            return Err(SchemaError::UnmatchedField(spec.name().to_string()));
        };

        let mut arms = arms.clone();
        for (_, format) in &mut arms {
            if let Some(format) = format {
                format.update(Some(mode), Some(alignment));
            }
        }

        Ok(Element::Discriminated(DiscriminatedElement {
            name: spec.name().to_string(),
            arms,
            of: of.clone(),
            mode,
            alignment,
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn arms(&self) -> &[(i128, Option<Message>)] {
        &self.arms
    }

    pub(crate) fn of(&self) -> &str {
        &self.of
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    fn arm(&self, discriminant: i128) -> Option<&Option<Message>> {
        self.arms
            .iter()
            .find(|(value, _)| *value == discriminant)
            .map(|(_, format)| format)
    }

    pub(crate) fn validate(&self, siblings: &[Element]) -> Result<(), ConfigError> {
        let sibling = element::find(siblings, &self.of).ok_or_else(|| {
            ConfigError::UnknownReference {
                field: self.name.clone(),
                target: self.of.clone(),
            }
        })?;
        let Element::Enum(reference) = sibling else {
            return Err(ConfigError::NotAnEnum {
                field: self.name.clone(),
                target: self.of.clone(),
            });
        };
        for (value, _) in &self.arms {
            if !reference.ty().contains_value(*value) {
                return Err(ConfigError::InvalidArmKey {
                    field: self.name.clone(),
                    value: *value,
                    enum_name: reference.ty().name().to_string(),
                });
            }
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
        for (_, format) in &mut self.arms {
            if let Some(format) = format {
                format.update(mode, alignment);
            }
        }
    }

    fn pack_discriminant(&self, values: &Record) -> PackResult<i128> {
        let value = values
            .get(&self.of)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.of.clone())))?;
        value.to_i128().ok_or_else(|| {
            PackError::new(PackErrorKind::WrongType {
                field: self.of.clone(),
                expected: "enum member",
            })
        })
    }

    fn sub_record<'v>(&self, values: &'v Record) -> PackResult<&'v Record> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        value.as_record().ok_or_else(|| {
            PackError::new(PackErrorKind::WrongType {
                field: self.name.clone(),
                expected: "record",
            })
        })
    }

    pub(crate) fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        let discriminant = self.pack_discriminant(values)?;
        let arm = self.arm(discriminant).ok_or_else(|| {
            PackError::new(PackErrorKind::InvalidDiscriminant {
                field: self.name.clone(),
                value: discriminant,
            })
        })?;
        match arm {
            Some(format) => format.pack_into(self.sub_record(values)?, buf),
            None => Ok(()),
        }
    }

    pub(crate) fn unpack(&self, partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let value = partial.get(&self.of).ok_or_else(|| {
            UnpackError::new(UnpackErrorKind::MissingReference {
                field: self.name.clone(),
                reference: self.of.clone(),
            })
        })?;
        let discriminant = value.to_i128().ok_or_else(|| {
            UnpackError::new(UnpackErrorKind::InvalidReference {
                field: self.name.clone(),
                reference: self.of.clone(),
            })
        })?;
        let arm = self.arm(discriminant).ok_or_else(|| {
            UnpackError::new(UnpackErrorKind::InvalidDiscriminant {
                field: self.name.clone(),
                value: discriminant,
            })
        })?;
        match arm {
            Some(format) => Ok(Value::Record(format.unpack_into(view)?)),
            None => Ok(Value::Null),
        }
    }

    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        let discriminant = self.pack_discriminant(values)?;
        let arm = self.arm(discriminant).ok_or_else(|| {
            PackError::new(PackErrorKind::InvalidDiscriminant {
                field: self.name.clone(),
                value: discriminant,
            })
        })?;
        match arm {
            Some(format) => Ok(Value::Record(format.make(self.sub_record(values)?)?)),
            None => Ok(Value::Null),
        }
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        let mut sizes = self.arms.iter().map(|(_, format)| {
            format.as_ref().and_then(Message::byte_size)
        });
        let first = sizes.next()??;
        for size in sizes {
            if size? != first {
                return None;
            }
        }
        Some(first)
    }
}
