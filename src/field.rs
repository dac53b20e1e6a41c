use std::sync::Arc;

use crate::message::Message;
use crate::value::EnumType;

/// One slot of a field specification, after the field name.
///
/// A specification is classified by the shape of its slots: which element
/// type claims it is decided by the registry's ordered predicates, not by
/// the constructor used to build it.
#[derive(Debug, Clone)]
pub enum SpecArg {
    /// A primitive format code, or the `F` fixed-point indicator.
    Fmt(String),
    /// An integer: a fixed repeat count, or a fixed-point precision.
    Num(i64),
    /// A sibling-field reference measured in nested records.
    Ref(String),
    /// A sibling-field reference measured in raw bytes.
    ByteRef(String),
    /// An enumeration type.
    Enum(Arc<EnumType>),
    /// A nested message template.
    Msg(Message),
    /// Discriminated arms: enum member value to optional format.
    Arms(Vec<(i128, Option<Message>)>),
}

/// The schema-author-facing description of one field: a name plus the
/// type-specific slots. Specifications are consumed during message
/// construction; each element variant copies what it needs.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    args: Vec<SpecArg>,
}

impl FieldSpec {
    pub fn new(name: &str, args: Vec<SpecArg>) -> Self {
        FieldSpec {
            name: name.to_string(),
            args,
        }
    }

    /// A scalar or string field: `("x", "B")`, `("tag", "4s")`.
    pub fn format(name: &str, fmt: &str) -> Self {
        FieldSpec::new(name, vec![SpecArg::Fmt(fmt.to_string())])
    }

    /// An enumeration field backed by a primitive integer format.
    pub fn enumeration(name: &str, fmt: &str, ty: &Arc<EnumType>) -> Self {
        FieldSpec::new(
            name,
            vec![SpecArg::Fmt(fmt.to_string()), SpecArg::Enum(Arc::clone(ty))],
        )
    }

    /// A length field counting the nested records of the variable field `of`.
    pub fn length(name: &str, fmt: &str, of: &str) -> Self {
        FieldSpec::new(
            name,
            vec![SpecArg::Fmt(fmt.to_string()), SpecArg::Ref(of.to_string())],
        )
    }

    /// A length field carrying a byte budget for the variable field `of`.
    pub fn byte_length(name: &str, fmt: &str, of: &str) -> Self {
        FieldSpec::new(
            name,
            vec![
                SpecArg::Fmt(fmt.to_string()),
                SpecArg::ByteRef(of.to_string()),
            ],
        )
    }

    /// A variable field whose record count comes from the sibling length
    /// field `count_field`.
    pub fn variable(name: &str, template: &Message, count_field: &str) -> Self {
        FieldSpec::new(
            name,
            vec![
                SpecArg::Msg(template.clone()),
                SpecArg::Ref(count_field.to_string()),
            ],
        )
    }

    /// A variable field whose byte budget comes from the sibling field
    /// `budget_field`.
    pub fn variable_bytes(name: &str, template: &Message, budget_field: &str) -> Self {
        FieldSpec::new(
            name,
            vec![
                SpecArg::Msg(template.clone()),
                SpecArg::ByteRef(budget_field.to_string()),
            ],
        )
    }

    /// A variable field repeated exactly `count` times.
    pub fn repeated(name: &str, template: &Message, count: usize) -> Self {
        FieldSpec::new(
            name,
            vec![SpecArg::Msg(template.clone()), SpecArg::Num(count as i64)],
        )
    }

    /// A fixed-point field: the `F` indicator, the underlying integer
    /// format, and the number of fractional bits.
    pub fn fixed_point(name: &str, fmt: &str, precision: u32) -> Self {
        FieldSpec::new(
            name,
            vec![
                SpecArg::Fmt("F".to_string()),
                SpecArg::Fmt(fmt.to_string()),
                SpecArg::Num(i64::from(precision)),
            ],
        )
    }

    /// A fixed-point field with an explicit output decimal precision
    /// (significant digits) for unpacked values.
    pub fn fixed_point_with_precision(
        name: &str,
        fmt: &str,
        precision: u32,
        decimal_prec: u32,
    ) -> Self {
        let mut spec = FieldSpec::fixed_point(name, fmt, precision);
        spec.args.push(SpecArg::Num(i64::from(decimal_prec)));
        spec
    }

    /// A discriminated field whose format arm is selected by the sibling
    /// enum field `enum_field`.
    pub fn discriminated(
        name: &str,
        arms: Vec<(i128, Option<Message>)>,
        enum_field: &str,
    ) -> Self {
        FieldSpec::new(
            name,
            vec![SpecArg::Arms(arms), SpecArg::Ref(enum_field.to_string())],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[SpecArg] {
        &self.args
    }
}
