//! The generated-code boundary: each element variant supplies the context
//! an external templating layer needs to render a declaration (for example
//! a C enum typedef) from schema metadata. Rendering itself happens outside
//! this crate.

use crate::code::FormatCode;
use crate::element::{Element, LengthUnit, VarRef};
use crate::message::Message;
use crate::mode::Mode;
use crate::value::EnumType;

/// Variant-specific declaration context for one element.
#[derive(Debug)]
pub enum DeclContext<'a> {
    Scalar {
        name: &'a str,
        format: &'a FormatCode,
        mode: Mode,
    },
    String {
        name: &'a str,
        format: &'a FormatCode,
        mode: Mode,
    },
    Enum {
        name: &'a str,
        format: &'a FormatCode,
        ty: &'a EnumType,
        mode: Mode,
    },
    FixedPoint {
        name: &'a str,
        format: &'a FormatCode,
        precision: u32,
        mode: Mode,
    },
    Length {
        name: &'a str,
        format: &'a FormatCode,
        of: &'a str,
        unit: LengthUnit,
        mode: Mode,
    },
    Variable {
        name: &'a str,
        template: &'a Message,
        reference: &'a VarRef,
        mode: Mode,
    },
    Discriminated {
        name: &'a str,
        arms: &'a [(i128, Option<Message>)],
        of: &'a str,
        mode: Mode,
    },
}

impl Element {
    /// The declaration context for this element.
    pub fn decl_context(&self) -> DeclContext<'_> {
        match self {
            Element::Scalar(e) => DeclContext::Scalar {
                name: e.name(),
                format: e.code(),
                mode: e.mode(),
            },
            Element::String(e) => DeclContext::String {
                name: e.name(),
                format: e.code(),
                mode: e.mode(),
            },
            Element::Enum(e) => DeclContext::Enum {
                name: e.name(),
                format: e.code(),
                ty: e.ty(),
                mode: e.mode(),
            },
            Element::FixedPoint(e) => DeclContext::FixedPoint {
                name: e.name(),
                format: e.code(),
                precision: e.precision(),
                mode: e.mode(),
            },
            Element::Length(e) => DeclContext::Length {
                name: e.name(),
                format: e.code(),
                of: e.of(),
                unit: e.unit(),
                mode: e.mode(),
            },
            Element::Variable(e) => DeclContext::Variable {
                name: e.name(),
                template: e.template(),
                reference: e.reference(),
                mode: e.mode(),
            },
            Element::Discriminated(e) => DeclContext::Discriminated {
                name: e.name(),
                arms: e.arms(),
                of: e.of(),
                mode: e.mode(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::value::EnumType;

    #[test]
    fn test_enum_context_carries_the_type() {
        let ty = EnumType::new("State", &[("idle", 0), ("busy", 1)]);
        let msg = Message::new(
            "M",
            &[FieldSpec::enumeration("state", "B", &ty)],
            Mode::Native,
        )
        .unwrap();

        match msg.elements()[0].decl_context() {
            DeclContext::Enum { name, ty, .. } => {
                assert_eq!(name, "state");
                assert_eq!(ty.name(), "State");
                let members: Vec<(&str, i128)> = ty.members().collect();
                assert_eq!(members, [("idle", 0), ("busy", 1)]);
            }
            other => panic!("unexpected context: {other:?}"),
        }
    }
}
