use std::sync::Arc;

use bytes::Bytes;
use rust_decimal::Decimal;

/// A closed set of named integer members, shared between a schema and the
/// values packed against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    members: Vec<(String, i128)>,
}

impl EnumType {
    pub fn new(name: &str, members: &[(&str, i128)]) -> Arc<Self> {
        Arc::new(EnumType {
            name: name.to_string(),
            members: members
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, i128)> {
        self.members.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Look up a member by name.
    pub fn member(self: &Arc<Self>, name: &str) -> Option<EnumMember> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(n, v)| EnumMember {
                ty: Arc::clone(self),
                name: n.clone(),
                value: *v,
            })
    }

    /// Look up a member by its underlying integer value.
    pub fn member_by_value(self: &Arc<Self>, value: i128) -> Option<EnumMember> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, v)| EnumMember {
                ty: Arc::clone(self),
                name: n.clone(),
                value: *v,
            })
    }

    pub fn contains_value(&self, value: i128) -> bool {
        self.members.iter().any(|(_, v)| *v == value)
    }
}

/// One member of an [`EnumType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    ty: Arc<EnumType>,
    name: String,
    value: i128,
}

impl EnumMember {
    pub fn ty(&self) -> &Arc<EnumType> {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> i128 {
        self.value
    }
}

/// A schemaless representation of any field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Nothing, produced by discriminated arms with no format.
    #[default]
    Null,

    /// Boolean value (`?` fields).
    Bool(bool),

    /// Signed integer fields.
    Int(i128),

    /// Unsigned integer fields.
    Uint(u128),

    /// Floating point fields (`f`, `d`).
    Float(f64),

    /// Fixed-point fields.
    Decimal(Decimal),

    /// Text fields (`c`, `s`, `p`).
    Str(String),

    /// Raw byte strings.
    Bytes(Bytes),

    /// Enumeration fields.
    Enum(EnumMember),

    /// Repeated nested records.
    List(Vec<Value>),

    /// A nested record.
    Record(Record),
}

impl Value {
    /// A short name for the value's variant, used in error reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Uint(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum member",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// The value as a signed integer, if it has an integer interpretation.
    /// Enum members convert to their underlying value.
    pub fn to_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i128::try_from(*v).ok(),
            Value::Enum(m) => Some(m.value()),
            _ => None,
        }
    }

    /// The value as an unsigned integer, if it is one and non-negative.
    pub fn to_u128(&self) -> Option<u128> {
        match self {
            Value::Uint(v) => Some(*v),
            Value::Int(v) => u128::try_from(*v).ok(),
            Value::Enum(m) => u128::try_from(m.value()).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident via $conv:ty),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Value {
                Value::$variant(v as $conv)
            }
        })*
    };
}

impl_value_from!(
    u8 => Uint via u128,
    u16 => Uint via u128,
    u32 => Uint via u128,
    u64 => Uint via u128,
    u128 => Uint via u128,
    usize => Uint via u128,
    i8 => Int via i128,
    i16 => Int via i128,
    i32 => Int via i128,
    i64 => Int via i128,
    i128 => Int via i128,
    f32 => Float via f64,
    f64 => Float via f64,
);

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Value {
        Value::Bytes(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Value {
        Value::Decimal(v)
    }
}

impl From<EnumMember> for Value {
    fn from(v: EnumMember) -> Value {
        Value::Enum(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::List(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Value {
        Value::Record(v)
    }
}

/// An ordered name-to-value map: the unit that `pack` consumes and `unpack`
/// and `make` produce. Field order follows insertion, which for unpacked
/// records is schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Insert or replace a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}

impl std::ops::Index<&str> for Record {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        self.get(name)
            .unwrap_or_else(|| panic!("no field {name:?} in record"))
    }
}
