//! The element type system: one codec behavior per field, selected by an
//! ordered predicate registry.

use std::sync::OnceLock;

use crate::buf::BufView;
use crate::code::padded_size;
use crate::error::{ConfigError, PackResult, SchemaError, UnpackResult};
use crate::field::FieldSpec;
use crate::mode::Mode;
use crate::value::{Record, Value};

mod discriminated;
mod enums;
mod fixedpoint;
mod length;
mod scalar;
mod string;
mod variable;

pub use discriminated::DiscriminatedElement;
pub use enums::EnumElement;
pub use fixedpoint::FixedPointElement;
pub use length::{LengthElement, LengthUnit};
pub use scalar::ScalarElement;
pub use string::StringElement;
pub use variable::{VarRef, VariableElement};

/// One field's codec behavior within a message schema.
///
/// The set of variants is closed; which variant a [`FieldSpec`] becomes is
/// decided by the [`Registry`].
#[derive(Debug, Clone)]
pub enum Element {
    Scalar(ScalarElement),
    String(StringElement),
    Enum(EnumElement),
    FixedPoint(FixedPointElement),
    Length(LengthElement),
    Variable(VariableElement),
    Discriminated(DiscriminatedElement),
}

macro_rules! each_variant {
    ($value:expr, $elem:ident => $body:expr) => {
        match $value {
            Element::Scalar($elem) => $body,
            Element::String($elem) => $body,
            Element::Enum($elem) => $body,
            Element::FixedPoint($elem) => $body,
            Element::Length($elem) => $body,
            Element::Variable($elem) => $body,
            Element::Discriminated($elem) => $body,
        }
    };
}

impl Element {
    /// The field's key in value records.
    pub fn name(&self) -> &str {
        each_variant!(self, e => e.name())
    }

    /// The element's current byte-order mode, kept consistent with the
    /// owning message through [`Element::update`].
    pub fn mode(&self) -> Mode {
        each_variant!(self, e => e.mode())
    }

    /// The element's current alignment. Fixed-point fields always report
    /// one, since alignment is not modeled for them.
    pub fn alignment(&self) -> usize {
        each_variant!(self, e => e.alignment())
    }

    /// Check cross-field reference integrity against the sibling elements
    /// of the owning message.
    pub fn validate(&self, siblings: &[Element]) -> Result<(), ConfigError> {
        each_variant!(self, e => e.validate(siblings))
    }

    /// Bring the element in line with the owning message's mode and
    /// alignment, cascading into any nested message.
    pub fn update(&mut self, mode: Option<Mode>, alignment: Option<usize>) {
        each_variant!(self, e => e.update(mode, alignment))
    }

    /// Encode this field's value from `values` onto the end of `buf`.
    pub fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        each_variant!(self, e => e.pack(values, buf))
    }

    /// Decode this field's value from the front of `view`. Fields decoded
    /// earlier in the same message are available in `partial` for
    /// cross-field references.
    pub fn unpack(&self, partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        each_variant!(self, e => e.unpack(partial, view))
    }

    /// The canonicalized in-memory value for this field, without
    /// serializing.
    pub fn make(&self, values: &Record) -> PackResult<Value> {
        each_variant!(self, e => e.make(values))
    }

    /// The fixed wire size of this field, if it does not depend on values.
    pub fn byte_size(&self) -> Option<usize> {
        each_variant!(self, e => e.byte_size())
    }
}

/// Look up a sibling element by field name.
pub(crate) fn find<'a>(elements: &'a [Element], name: &str) -> Option<&'a Element> {
    elements.iter().find(|e| e.name() == name)
}

/// Right-pad everything written since `start` with zeroes up to the
/// alignment.
pub(crate) fn pad_to_alignment(buf: &mut Vec<u8>, start: usize, alignment: usize) {
    let padded = padded_size(buf.len() - start, alignment);
    buf.resize(start + padded, 0);
}

type MatchFn = fn(&FieldSpec) -> bool;
type BuildFn = fn(&FieldSpec, Mode, usize) -> Result<Element, SchemaError>;

/// An ordered list of (predicate, constructor) pairs mapping field
/// specifications to element variants.
///
/// Predicates are not guaranteed mutually exclusive, so registration order
/// is a deliberate tie-break: classification walks the list in order and
/// the first match wins.
pub struct Registry {
    kinds: Vec<(MatchFn, BuildFn)>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { kinds: Vec::new() }
    }

    /// Append a candidate element type. Later registrations only see
    /// specifications no earlier predicate claimed.
    pub fn register(&mut self, matches: MatchFn, build: BuildFn) {
        self.kinds.push((matches, build));
    }

    /// The built-in element types, most specific first.
    pub fn standard() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut registry = Registry::new();
            registry.register(FixedPointElement::matches, FixedPointElement::build);
            registry.register(LengthElement::matches, LengthElement::build);
            registry.register(EnumElement::matches, EnumElement::build);
            registry.register(VariableElement::matches, VariableElement::build);
            registry.register(DiscriminatedElement::matches, DiscriminatedElement::build);
            registry.register(ScalarElement::matches, ScalarElement::build);
            registry.register(StringElement::matches, StringElement::build);
            registry
        })
    }

    /// Construct the element for `spec` using the first matching candidate.
    pub fn classify(
        &self,
        spec: &FieldSpec,
        mode: Mode,
        alignment: usize,
    ) -> Result<Element, SchemaError> {
        for (matches, build) in &self.kinds {
            if matches(spec) {
                return build(spec, mode, alignment);
            }
        }
        Err(SchemaError::UnmatchedField(spec.name().to_string()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::mode::Mode;

    #[test]
    fn test_classification() {
        let registry = Registry::standard();

        let elem = registry
            .classify(&FieldSpec::format("x", "B"), Mode::Native, 1)
            .unwrap();
        assert!(matches!(elem, Element::Scalar(_)));

        let elem = registry
            .classify(&FieldSpec::format("tag", "4s"), Mode::Native, 1)
            .unwrap();
        assert!(matches!(elem, Element::String(_)));

        let elem = registry
            .classify(&FieldSpec::fixed_point("ratio", "i", 8), Mode::Native, 1)
            .unwrap();
        assert!(matches!(elem, Element::FixedPoint(_)));
    }

    #[test]
    fn test_unmatched_spec() {
        let err = Registry::standard()
            .classify(&FieldSpec::format("x", "Z"), Mode::Native, 1)
            .unwrap_err();
        assert_eq!(err, SchemaError::UnmatchedField("x".to_string()));
    }

    #[test]
    fn test_empty_registry_matches_nothing() {
        let registry = Registry::new();
        let err = registry
            .classify(&FieldSpec::format("x", "B"), Mode::Native, 1)
            .unwrap_err();
        assert_eq!(err, SchemaError::UnmatchedField("x".to_string()));
    }
}
