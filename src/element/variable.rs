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

/// How a variable field resolves its extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarRef {
    /// A sibling length field gives the number of nested records.
    Count(String),
    /// A sibling field gives a byte budget.
    Size(String),
    /// The repeat count is baked into the schema.
    Fixed(usize),
}

/// A field holding zero or more nested records, each encoded by a nested
/// message template.
///
/// The extent is either linked to a sibling field (a record count or a
/// byte budget) or fixed at schema definition time. Packing under a byte
/// budget drops the units that would overflow it rather than failing.
#[derive(Debug, Clone)]
pub struct VariableElement {
    name: String,
    template: Message,
    reference: VarRef,
    mode: Mode,
    alignment: usize,
}

impl VariableElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        matches!(
            spec.args(),
            [
                SpecArg::Msg(_),
                SpecArg::Ref(_) | SpecArg::ByteRef(_) | SpecArg::Num(_)
            ]
        )
    }

    pub(crate) fn build(
        spec: &FieldSpec,
        mode: Mode,
        alignment: usize,
    ) -> Result<Element, SchemaError> {
        let (template, reference) = match spec.args() {
            [SpecArg::Msg(template), SpecArg::Ref(name)] => {
                (template, VarRef::Count(name.clone()))
            }
            [SpecArg::Msg(template), SpecArg::ByteRef(name)] => {
                (template, VarRef::Size(name.clone()))
            }
            [SpecArg::Msg(template), SpecArg::Num(count)] => {
                let count = usize::try_from(*count).map_err(|_| {
                    SchemaError::InvalidRepeatCount {
                        field: spec.name().to_string(),
                        count: *count,
                    }
                })?;
                (template, VarRef::Fixed(count))
            }
            _ => return Err(SchemaError::UnmatchedField(spec.name().to_string())),
        };

        // The template follows the owning message's settings from the start.
        let mut template = template.clone();
        template.update(Some(mode), Some(alignment));

        Ok(Element::Variable(VariableElement {
            name: spec.name().to_string(),
            template,
            reference,
            mode,
            alignment,
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn template(&self) -> &Message {
        &self.template
    }

    pub(crate) fn reference(&self) -> &VarRef {
        &self.reference
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    pub(crate) fn validate(&self, siblings: &[Element]) -> Result<(), ConfigError> {
        match &self.reference {
            VarRef::Count(target) => {
                let sibling = element::find(siblings, target).ok_or_else(|| {
                    ConfigError::UnknownReference {
                        field: self.name.clone(),
                        target: target.clone(),
                    }
                })?;
                let Element::Length(length) = sibling else {
                    return Err(ConfigError::NotALength {
                        field: self.name.clone(),
                        target: target.clone(),
                    });
                };
                if length.of() != self.name {
                    return Err(ConfigError::ReferenceMismatch {
                        field: self.name.clone(),
                        target: target.clone(),
                        actual: format!("{:?}", length.of()),
                    });
                }
                if length.unit() != super::LengthUnit::Records {
                    return Err(ConfigError::UnitMismatch {
                        field: self.name.clone(),
                        target: target.clone(),
                    });
                }
                Ok(())
            }
            // A byte budget may come from any sibling that unpacks to an
            // unsigned integer.
            VarRef::Size(target) => {
                element::find(siblings, target)
                    .map(|_| ())
                    .ok_or_else(|| ConfigError::UnknownReference {
                        field: self.name.clone(),
                        target: target.clone(),
                    })
            }
            VarRef::Fixed(_) => Ok(()),
        }
    }

    pub(crate) fn update(&mut self, mode: Option<Mode>, alignment: Option<usize>) {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(alignment) = alignment {
            self.alignment = alignment;
        }
        self.template.update(mode, alignment);
    }

    fn record_items<'v>(&self, value: &'v Value) -> PackResult<Vec<&'v Record>> {
        let list = value.as_list().ok_or_else(|| {
            PackError::new(PackErrorKind::WrongType {
                field: self.name.clone(),
                expected: "list",
            })
        })?;
        list.iter()
            .map(|item| {
                item.as_record().ok_or_else(|| {
                    PackError::new(PackErrorKind::WrongType {
                        field: self.name.clone(),
                        expected: "record",
                    })
                })
            })
            .collect()
    }

    pub(crate) fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let items = self.record_items(value)?;

        match &self.reference {
            // The count is derived from the list by the length element;
            // every supplied record is packed.
            VarRef::Count(_) => {
                for item in items {
                    self.template.pack_into(item, buf)?;
                }
            }
            VarRef::Size(budget_field) => {
                let budget = values
                    .get(budget_field)
                    .ok_or_else(|| {
                        PackError::new(PackErrorKind::MissingField(budget_field.clone()))
                    })?
                    .to_u128()
                    .ok_or_else(|| {
                        PackError::new(PackErrorKind::WrongType {
                            field: budget_field.clone(),
                            expected: "unsigned integer",
                        })
                    })?;
                let mut used = 0u128;
                for item in items {
                    let unit = self.template.pack(item)?;
                    if used + unit.len() as u128 <= budget {
                        used += unit.len() as u128;
                        buf.extend_from_slice(&unit);
                    }
                    // Units past the budget are dropped without error.
                }
            }
            VarRef::Fixed(count) => {
                for index in 0..*count {
                    match items.get(index) {
                        Some(&item) => self.template.pack_into(item, buf)?,
                        None => {
                            // Missing slots are filled with the template's
                            // empty encoding.
                            let unit = self.template.byte_size().ok_or_else(|| {
                                PackError::new(PackErrorKind::IndeterminateSize {
                                    field: self.name.clone(),
                                })
                            })?;
                            buf.resize(buf.len() + unit, 0);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn reference_value(&self, partial: &Record, reference: &str) -> UnpackResult<u128> {
        let value = partial.get(reference).ok_or_else(|| {
            UnpackError::new(UnpackErrorKind::MissingReference {
                field: self.name.clone(),
                reference: reference.to_string(),
            })
        })?;
        value.to_u128().ok_or_else(|| {
            UnpackError::new(UnpackErrorKind::InvalidReference {
                field: self.name.clone(),
                reference: reference.to_string(),
            })
        })
    }

    pub(crate) fn unpack(&self, partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let mut items = Vec::new();
        match &self.reference {
            VarRef::Count(reference) => {
                let count = self.reference_value(partial, reference)?;
                for _ in 0..count {
                    items.push(Value::Record(self.template.unpack_into(view)?));
                }
            }
            VarRef::Size(reference) => {
                let budget = self.reference_value(partial, reference)?;
                let mut consumed = 0u128;
                while consumed < budget {
                    let before = view.len();
                    items.push(Value::Record(self.template.unpack_into(view)?));
                    if view.len() == before {
                        // A zero-size unit cannot make progress against the
                        // budget.
                        break;
                    }
                    consumed += (before - view.len()) as u128;
                }
            }
            VarRef::Fixed(count) => {
                for _ in 0..*count {
                    items.push(Value::Record(self.template.unpack_into(view)?));
                }
            }
        }
        Ok(Value::List(items))
    }

    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let items = self.record_items(value)?;
        let made = items
            .into_iter()
            .map(|item| self.template.make(item).map(Value::Record))
            .collect::<PackResult<Vec<Value>>>()?;
        Ok(Value::List(made))
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        match self.reference {
            VarRef::Fixed(count) => self.template.byte_size().map(|unit| unit * count),
            _ => None,
        }
    }
}
