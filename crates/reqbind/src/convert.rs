//! String to typed value conversion.
//!
//! [`convert`] turns one raw request string into an [`Assignment`] for a
//! field of the given [`TypeKind`]. Vector kinds split the input on commas
//! and convert each part on its own.

use std::num::IntErrorKind;

use num_complex::{Complex32, Complex64};

use crate::target::{Assignment, ScalarKind, TypeKind, Value};
use crate::ConvertError;

/// Separator for list-valued fields.
pub const LIST_SEPARATOR: char = ',';

/// Converts a raw value into an assignment for `kind`.
///
/// Returns `Ok(None)` for an empty input: the field keeps its current value.
/// Kinds that can never be bound from a string fail regardless of input.
///
/// # Example
///
/// ```rust
/// use reqbind::{convert, Assignment, ScalarKind, TypeKind, Value};
///
/// let list = convert("1,,3", TypeKind::Slice(ScalarKind::U8)).unwrap();
/// assert_eq!(
///     list,
///     Some(Assignment::List(vec![Some(Value::U8(1)), None, Some(Value::U8(3))]))
/// );
///
/// assert_eq!(convert("", TypeKind::Scalar(ScalarKind::I32)).unwrap(), None);
/// ```
pub fn convert(raw: &str, kind: TypeKind) -> Result<Option<Assignment>, ConvertError> {
    let element = match kind {
        TypeKind::Scalar(element) | TypeKind::Slice(element) => element,
        TypeKind::File | TypeKind::OptionalFile | TypeKind::Unsupported(_) => {
            return Err(ConvertError::Unsupported(kind.describe()));
        }
    };

    if raw.is_empty() {
        return Ok(None);
    }

    if let TypeKind::Scalar(_) = kind {
        return parse_scalar(raw, element).map(|v| Some(Assignment::Scalar(v)));
    }

    let items = raw
        .split(LIST_SEPARATOR)
        .enumerate()
        .map(|(index, part)| {
            if part.is_empty() {
                Ok(None)
            } else {
                parse_scalar(part, element)
                    .map(Some)
                    .map_err(|e| ConvertError::element(index, e))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Assignment::List(items)))
}

/// Parses a single non-empty value into `kind`.
pub fn parse_scalar(raw: &str, kind: ScalarKind) -> Result<Value, ConvertError> {
    match kind {
        ScalarKind::Bool => parse_bool(raw).map(Value::Bool),
        ScalarKind::I8 => parse_int(raw, kind).map(Value::I8),
        ScalarKind::I16 => parse_int(raw, kind).map(Value::I16),
        ScalarKind::I32 => parse_int(raw, kind).map(Value::I32),
        ScalarKind::I64 => parse_int(raw, kind).map(Value::I64),
        ScalarKind::Isize => parse_int(raw, kind).map(Value::Isize),
        ScalarKind::U8 => parse_unsigned(raw, kind).map(Value::U8),
        ScalarKind::U16 => parse_unsigned(raw, kind).map(Value::U16),
        ScalarKind::U32 => parse_unsigned(raw, kind).map(Value::U32),
        ScalarKind::U64 => parse_unsigned(raw, kind).map(Value::U64),
        ScalarKind::Usize => parse_unsigned(raw, kind).map(Value::Usize),
        ScalarKind::F32 => parse_float::<f32>(raw, kind).map(Value::F32),
        ScalarKind::F64 => parse_float::<f64>(raw, kind).map(Value::F64),
        ScalarKind::Complex32 => parse_complex::<f32>(raw, kind)
            .map(|(re, im)| Value::Complex32(Complex32::new(re, im))),
        ScalarKind::Complex64 => parse_complex::<f64>(raw, kind)
            .map(|(re, im)| Value::Complex64(Complex64::new(re, im))),
        ScalarKind::String => Ok(Value::String(raw.to_string())),
    }
}

fn parse_bool(raw: &str) -> Result<bool, ConvertError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ConvertError::parse(ScalarKind::Bool, raw, "invalid syntax")),
    }
}

fn int_reason(kind: &IntErrorKind) -> &'static str {
    match kind {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => "value out of range",
        _ => "invalid syntax",
    }
}

fn parse_int<T>(raw: &str, kind: ScalarKind) -> Result<T, ConvertError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    raw.parse::<T>()
        .map_err(|e| ConvertError::parse(kind, raw, int_reason(e.kind())))
}

fn parse_unsigned<T>(raw: &str, kind: ScalarKind) -> Result<T, ConvertError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    // Unsigned targets take digits only; a sign is never valid.
    if raw.starts_with('+') {
        return Err(ConvertError::parse(kind, raw, "invalid syntax"));
    }
    parse_int(raw, kind)
}

/// Float widths the converter can target.
trait FloatComponent: std::str::FromStr + Copy {
    fn is_infinite(self) -> bool;
}

impl FloatComponent for f32 {
    fn is_infinite(self) -> bool {
        f32::is_infinite(self)
    }
}

impl FloatComponent for f64 {
    fn is_infinite(self) -> bool {
        f64::is_infinite(self)
    }
}

fn parse_float<T: FloatComponent>(raw: &str, kind: ScalarKind) -> Result<T, ConvertError> {
    if !is_float_literal(raw) {
        return Err(ConvertError::parse(kind, raw, "invalid syntax"));
    }

    let value = raw
        .parse::<T>()
        .map_err(|_| ConvertError::parse(kind, raw, "invalid syntax"))?;

    if value.is_infinite() && !is_infinity_literal(raw) {
        return Err(ConvertError::parse(kind, raw, "value out of range"));
    }
    Ok(value)
}

/// Parses `N`, `Ni` or `N±Ni`, optionally wrapped in parentheses.
fn parse_complex<T: FloatComponent + Default>(
    raw: &str,
    kind: ScalarKind,
) -> Result<(T, T), ConvertError> {
    let syntax = || ConvertError::parse(kind, raw, "invalid syntax");
    let component = |text: &str| parse_float::<T>(text, kind).map_err(|e| rebind(e, raw));

    let s = raw
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(raw);

    let first_len = float_prefix_len(s);
    if first_len == 0 {
        return Err(syntax());
    }
    let (first, rest) = s.split_at(first_len);
    let first = component(first)?;

    match rest {
        "" => return Ok((first, T::default())),
        "i" => return Ok((T::default(), first)),
        _ => {}
    }

    // A '+' is consumed so that "+NaNi" parses; "++" stays an error.
    let second = match rest.strip_prefix('+') {
        Some(unsigned) if !unsigned.starts_with('+') => unsigned,
        _ if rest.starts_with('-') => rest,
        _ => return Err(syntax()),
    };

    let imaginary = second.strip_suffix('i').ok_or_else(syntax)?;
    if imaginary.is_empty() || float_prefix_len(imaginary) != imaginary.len() {
        return Err(syntax());
    }

    Ok((first, component(imaginary)?))
}

/// Reports a component failure against the whole complex input.
fn rebind(error: ConvertError, raw: &str) -> ConvertError {
    match error {
        ConvertError::Parse { kind, reason, .. } => ConvertError::Parse {
            kind,
            input: raw.to_string(),
            reason,
        },
        other => other,
    }
}

fn is_float_literal(s: &str) -> bool {
    !s.is_empty() && float_prefix_len(s) == s.len()
}

fn is_infinity_literal(s: &str) -> bool {
    let unsigned = s.trim_start_matches(&['+', '-'][..]);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

/// Length of the longest prefix of `s` shaped like a decimal float:
/// optional sign, then `inf`, `infinity`, `nan`, or digits with an optional
/// fraction and exponent. Returns 0 when no such prefix exists.
fn float_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    for special in ["infinity", "inf", "nan"] {
        let end = i + special.len();
        if bytes.len() >= end && bytes[i..end].eq_ignore_ascii_case(special.as_bytes()) {
            return end;
        }
    }

    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_digits = digits(i);
    i += int_digits;
    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        frac_digits = digits(i + 1);
        i += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = digits(j);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }

    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(raw: &str, kind: ScalarKind) -> Result<Value, ConvertError> {
        parse_scalar(raw, kind)
    }

    #[test]
    fn test_empty_input_is_not_assigned() {
        assert_eq!(convert("", TypeKind::Scalar(ScalarKind::Bool)).unwrap(), None);
        assert_eq!(convert("", TypeKind::Slice(ScalarKind::I64)).unwrap(), None);
    }

    #[test]
    fn test_bool_literals() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(scalar(raw, ScalarKind::Bool).unwrap(), Value::Bool(true));
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(scalar(raw, ScalarKind::Bool).unwrap(), Value::Bool(false));
        }
        let err = scalar("yes", ScalarKind::Bool).unwrap_err();
        assert_eq!(err.kind(), Some(ScalarKind::Bool));
    }

    #[test]
    fn test_signed_range() {
        assert_eq!(scalar("-128", ScalarKind::I8).unwrap(), Value::I8(-128));
        assert_eq!(scalar("+127", ScalarKind::I8).unwrap(), Value::I8(127));

        let err = scalar("128", ScalarKind::I8).unwrap_err();
        assert_eq!(err.bits(), Some(8));
        assert!(err.to_string().contains("out of range"));

        assert!(scalar("1.5", ScalarKind::I32).is_err());
        assert!(scalar("0x10", ScalarKind::I64).is_err());
        assert!(scalar("1_000", ScalarKind::I64).is_err());
    }

    #[test]
    fn test_unsigned_rejects_signs() {
        assert_eq!(scalar("65535", ScalarKind::U16).unwrap(), Value::U16(65535));
        assert!(scalar("65536", ScalarKind::U16).is_err());
        assert!(scalar("-1", ScalarKind::U32).is_err());
        assert!(scalar("+1", ScalarKind::U32).is_err());
        assert_eq!(
            scalar("18446744073709551615", ScalarKind::U64).unwrap(),
            Value::U64(u64::MAX)
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(scalar("1.5", ScalarKind::F64).unwrap(), Value::F64(1.5));
        assert_eq!(scalar("-2e3", ScalarKind::F32).unwrap(), Value::F32(-2000.0));
        assert_eq!(scalar(".5", ScalarKind::F64).unwrap(), Value::F64(0.5));
        assert_eq!(scalar("5.", ScalarKind::F64).unwrap(), Value::F64(5.0));
        assert_eq!(
            scalar("-Inf", ScalarKind::F64).unwrap(),
            Value::F64(f64::NEG_INFINITY)
        );
        assert!(matches!(scalar("NaN", ScalarKind::F32).unwrap(), Value::F32(v) if v.is_nan()));

        let err = scalar("1e39", ScalarKind::F32).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(scalar("1e39", ScalarKind::F64).is_ok());
        assert!(scalar("1e", ScalarKind::F64).is_err());
        assert!(scalar("abc", ScalarKind::F64).is_err());
        assert!(scalar(" 1", ScalarKind::F64).is_err());
    }

    #[test]
    fn test_complex_forms() {
        assert_eq!(
            scalar("1+2i", ScalarKind::Complex64).unwrap(),
            Value::Complex64(Complex64::new(1.0, 2.0))
        );
        assert_eq!(
            scalar("(1.5-0.5i)", ScalarKind::Complex64).unwrap(),
            Value::Complex64(Complex64::new(1.5, -0.5))
        );
        assert_eq!(
            scalar("3", ScalarKind::Complex32).unwrap(),
            Value::Complex32(Complex32::new(3.0, 0.0))
        );
        assert_eq!(
            scalar("-4i", ScalarKind::Complex32).unwrap(),
            Value::Complex32(Complex32::new(0.0, -4.0))
        );
        assert_eq!(
            scalar("1e2+3e-1i", ScalarKind::Complex64).unwrap(),
            Value::Complex64(Complex64::new(100.0, 0.3))
        );
    }

    #[test]
    fn test_complex_errors() {
        for raw in ["i", "1+i", "1 + 2i", "1++2i", "1+2", "1+2j", "(1+2i", "1+2ii"] {
            let err = scalar(raw, ScalarKind::Complex64).unwrap_err();
            assert_eq!(err.kind(), Some(ScalarKind::Complex64), "input {raw:?}");
        }

        let err = scalar("1e39+1i", ScalarKind::Complex32).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(err.to_string().contains("1e39+1i"));
    }

    #[test]
    fn test_string_is_verbatim() {
        assert_eq!(
            scalar(" a,b ", ScalarKind::String).unwrap(),
            Value::String(" a,b ".into())
        );
    }

    #[test]
    fn test_slice_split() {
        let out = convert("1,2,3", TypeKind::Slice(ScalarKind::I32)).unwrap();
        assert_eq!(
            out,
            Some(Assignment::List(vec![
                Some(Value::I32(1)),
                Some(Value::I32(2)),
                Some(Value::I32(3)),
            ]))
        );

        let out = convert(",", TypeKind::Slice(ScalarKind::String)).unwrap();
        assert_eq!(out, Some(Assignment::List(vec![None, None])));
    }

    #[test]
    fn test_slice_element_error_has_index() {
        let err = convert("1,x,3", TypeKind::Slice(ScalarKind::U8)).unwrap_err();
        match &err {
            ConvertError::Element { index, .. } => assert_eq!(*index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), Some(ScalarKind::U8));
    }

    #[test]
    fn test_unsupported_kinds_rejected_for_any_input() {
        for raw in ["", "1", "a,b"] {
            let err = convert(raw, TypeKind::Unsupported("slice of slice")).unwrap_err();
            assert_eq!(err, ConvertError::Unsupported("slice of slice"));

            let err = convert(raw, TypeKind::File).unwrap_err();
            assert!(err.is_unsupported());
        }
    }

    #[test]
    fn test_float_prefix_len() {
        assert_eq!(float_prefix_len("1.5e3i"), 5);
        assert_eq!(float_prefix_len("-infi"), 4);
        assert_eq!(float_prefix_len("+Infinity"), 9);
        assert_eq!(float_prefix_len("1e+i"), 1);
        assert_eq!(float_prefix_len("."), 0);
        assert_eq!(float_prefix_len("i"), 0);
    }
}
