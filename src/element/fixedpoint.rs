use std::str::FromStr;

use bytes::Bytes;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::buf::BufView;
use crate::code::{self, FormatCode};
use crate::element::Element;
use crate::error::{
    ConfigError, PackError, PackErrorKind, PackResult, SchemaError, UnpackResult,
};
use crate::field::{FieldSpec, SpecArg};
use crate::mode::Mode;
use crate::value::{Record, Value};

/// Default output precision, in significant digits, for unpacked values.
const DEFAULT_DECIMAL_PRECISION: u32 = 26;

/// A binary fixed-point field: a primitive integer on the wire, a decimal
/// in values, with `precision` bits reserved for the fraction.
///
/// `make` does not mirror pack's decimal scaling: it encodes the raw
/// integer input through the primitive layout and yields the bytes. That
/// asymmetry is part of the schema-author contract and is kept as-is.
#[derive(Debug, Clone)]
pub struct FixedPointElement {
    name: String,
    code: FormatCode,
    precision: u32,
    decimal_prec: u32,
    mode: Mode,
}

fn is_indicator(fmt: &str) -> bool {
    let digits = fmt.chars().take_while(|c| c.is_ascii_digit()).count();
    &fmt[digits..] == "F"
}

fn pow2(bits: u32) -> Decimal {
    Decimal::from_i128_with_scale(1i128 << bits, 0)
}

impl FixedPointElement {
    pub(crate) fn matches(spec: &FieldSpec) -> bool {
        let (head, tail) = match spec.args() {
            [a, b, c] => ([a, b, c], None),
            [a, b, c, d] => ([a, b, c], Some(d)),
            _ => return false,
        };
        let [SpecArg::Fmt(indicator), SpecArg::Fmt(fmt), SpecArg::Num(precision)] = head else {
            return false;
        };
        if let Some(arg) = tail {
            let SpecArg::Num(decimal_prec) = arg else {
                return false;
            };
            if *decimal_prec < 1 {
                return false;
            }
        }
        is_indicator(indicator)
            && *precision >= 0
            && FormatCode::parse(fmt).is_some_and(|code| code.is_int() && !code.has_repeat())
    }

    pub(crate) fn build(
        spec: &FieldSpec,
        mode: Mode,
        _alignment: usize,
    ) -> Result<Element, SchemaError> {
        let (fmt, precision, decimal_prec) = match spec.args() {
            [SpecArg::Fmt(_), SpecArg::Fmt(fmt), SpecArg::Num(p)] => (fmt, *p, None),
            [SpecArg::Fmt(_), SpecArg::Fmt(fmt), SpecArg::Num(p), SpecArg::Num(dp)] => {
                (fmt, *p, Some(*dp))
            }
            _ => return Err(SchemaError::UnmatchedField(spec.name().to_string())),
        };
        let code = FormatCode::parse(fmt).ok_or_else(|| SchemaError::InvalidFormat {
            field: spec.name().to_string(),
            format: fmt.clone(),
        })?;
        let precision = precision as u32;
        if precision > code.bits() {
            return Err(SchemaError::PrecisionTooLarge {
                field: spec.name().to_string(),
                format: fmt.clone(),
                precision,
                bits: code.bits(),
            });
        }
        Ok(Element::FixedPoint(FixedPointElement {
            name: spec.name().to_string(),
            code,
            precision,
            decimal_prec: decimal_prec.map_or(DEFAULT_DECIMAL_PRECISION, |dp| dp as u32),
            mode,
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn code(&self) -> &FormatCode {
        &self.code
    }

    pub(crate) fn precision(&self) -> u32 {
        self.precision
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    /// Alignment is not modeled for fixed-point fields.
    pub(crate) fn alignment(&self) -> usize {
        1
    }

    pub(crate) fn validate(&self, _siblings: &[Element]) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Fixed-point fields live at their natural primitive width; alignment
    /// does not apply to them.
    pub(crate) fn update(&mut self, mode: Option<Mode>, _alignment: Option<usize>) {
        if let Some(mode) = mode {
            self.mode = mode;
        }
    }

    fn decimal_input(&self, value: &Value) -> PackResult<Decimal> {
        let converted = match value {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Decimal::try_from(*i).ok(),
            Value::Uint(u) => i128::try_from(*u)
                .ok()
                .and_then(|i| Decimal::try_from(i).ok()),
            Value::Float(f) => Decimal::try_from(*f).ok(),
            Value::Str(s) => Decimal::from_str(s).ok(),
            _ => {
                return Err(PackError::new(PackErrorKind::WrongType {
                    field: self.name.clone(),
                    expected: "decimal",
                }));
            }
        };
        converted.ok_or_else(|| {
            PackError::new(PackErrorKind::NotDecimal {
                field: self.name.clone(),
                value: format!("{value:?}"),
            })
        })
    }

    fn range_error(&self, value: &Decimal) -> PackError {
        PackError::new(PackErrorKind::FixedPointRange {
            field: self.name.clone(),
            value: value.to_string(),
            integer_bits: self.code.bits() - self.precision,
            precision: self.precision,
        })
    }

    pub(crate) fn pack(&self, values: &Record, buf: &mut Vec<u8>) -> PackResult<()> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let decimal = self.decimal_input(value)?;

        let integer_bits = self.code.bits() - self.precision;
        if decimal.abs() >= pow2(integer_bits) {
            return Err(self.range_error(&decimal));
        }

        let scaled = (decimal * pow2(self.precision)).round();
        let raw = scaled.to_i128().ok_or_else(|| self.range_error(&decimal))?;
        let fits = if self.code.is_signed() {
            code::int_fits(raw, self.code.bits())
        } else {
            u128::try_from(raw).is_ok_and(|v| code::uint_fits(v, self.code.bits()))
        };
        if !fits {
            return Err(self.range_error(&decimal));
        }

        code::write_int(buf, raw, self.code.size(), self.mode.byte_order());
        Ok(())
    }

    pub(crate) fn unpack(&self, _partial: &Record, view: &mut BufView<'_>) -> UnpackResult<Value> {
        let chunk = view.read(self.code.size())?;
        let order = self.mode.byte_order();
        let raw = if self.code.is_signed() {
            code::read_int(&chunk, order)
        } else {
            code::read_uint(&chunk, order) as i128
        };

        let result = Decimal::from_i128_with_scale(raw, 0) / pow2(self.precision);
        let result = result.round_sf(self.decimal_prec).unwrap_or(result);
        Ok(Value::Decimal(result))
    }

    /// Emits the primitive-packed bytes of the raw integer input rather
    /// than a canonical decimal.
    pub(crate) fn make(&self, values: &Record) -> PackResult<Value> {
        let value = values
            .get(&self.name)
            .ok_or_else(|| PackError::new(PackErrorKind::MissingField(self.name.clone())))?;
        let raw = value.to_i128().ok_or_else(|| {
            PackError::new(PackErrorKind::WrongType {
                field: self.name.clone(),
                expected: "integer",
            })
        })?;
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

        let mut buf = Vec::with_capacity(self.code.size());
        code::write_int(&mut buf, raw, self.code.size(), self.mode.byte_order());
        Ok(Value::Bytes(Bytes::from(buf)))
    }

    pub(crate) fn byte_size(&self) -> Option<usize> {
        Some(self.code.size())
    }
}
