//! Number strings and the casting validators built on them.
//!
//! Every casting validator is a `cast(can_accept, cast_fn, target)`: a value
//! already in target form passes untouched, anything else must pass
//! `can_accept` before it is converted and checked again.

use std::borrow::Cow;

use serde_json::Value;

use super::combinator::{cast, Cast};
use super::primitive::{boolean, integer, natural_number, number, number_value, string};
use super::{Assert, Mixed, Refined};
use crate::error::AssertError;

/// Strings that parse as a finite number (`"1.5"`, `"-2e3"`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FiniteNumberString;

impl Assert for FiniteNumberString {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::String(s)) if parse_finite(s).is_some() => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "a finite number string", mixed)),
        }
    }
}

pub fn finite_number_string() -> FiniteNumberString {
    FiniteNumberString
}

/// Strings made of an optional sign followed by digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerString;

impl Assert for IntegerString {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::String(s)) if is_integer_text(s) => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "an integer string", mixed)),
        }
    }
}

pub fn integer_string() -> IntegerString {
    IntegerString
}

/// Strings made of digits only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalNumberString;

impl Assert for NaturalNumberString {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::String(s)) if is_digits(s) => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "a natural number string", mixed)),
        }
    }
}

pub fn natural_number_string() -> NaturalNumberString {
    NaturalNumberString
}

fn parse_finite(s: &str) -> Option<f64> {
    // `f64::from_str` also accepts "inf" and "NaN"; those are not finite.
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer_text(s: &str) -> bool {
    is_digits(s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s))
}

/// Parse a validated number string. Unparseable input is returned as is so
/// that the target validator reports it.
fn parse_number(value: &Value) -> Value {
    value
        .as_str()
        .and_then(parse_finite)
        .map_or_else(|| value.clone(), number_value)
}

/// `n != 0`.
pub fn number_to_boolean() -> Cast {
    cast(
        number(),
        |value: &Value| Value::Bool(value.as_f64().is_some_and(|n| n != 0.0)),
        boolean(),
    )
}

/// `"1"` and any casing of `"true"` are true; every other string is false.
pub fn string_to_boolean() -> Cast {
    cast(
        string(),
        |value: &Value| {
            let raw = value.as_str().unwrap_or_default();
            Value::Bool(raw == "1" || raw.eq_ignore_ascii_case("true"))
        },
        boolean(),
    )
}

pub fn string_to_number() -> Cast {
    cast(finite_number_string(), parse_number, number())
}

pub fn string_to_integer() -> Cast {
    cast(integer_string(), parse_number, integer())
}

pub fn string_to_natural_number() -> Cast {
    cast(natural_number_string(), parse_number, natural_number())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert::AssertExt;
    use serde_json::json;

    #[test]
    fn number_strings() {
        assert!(finite_number_string().assert("s", Some(&json!("-2.5e3"))).is_ok());
        assert!(finite_number_string().assert("s", Some(&json!("inf"))).is_err());
        assert!(finite_number_string().assert("s", Some(&json!("NaN"))).is_err());
        assert!(finite_number_string().assert("s", Some(&json!(""))).is_err());
        assert!(integer_string().assert("s", Some(&json!("+12"))).is_ok());
        assert!(integer_string().assert("s", Some(&json!("1.0"))).is_err());
        assert!(integer_string().assert("s", Some(&json!("-"))).is_err());
        assert!(natural_number_string().assert("s", Some(&json!("007"))).is_ok());
        assert!(natural_number_string().assert("s", Some(&json!("-7"))).is_err());
    }

    #[test]
    fn string_to_number_casts_and_skips() {
        assert_eq!(string_to_number().check("raw", &json!("42")).unwrap(), Some(json!(42)));
        assert_eq!(string_to_number().check("raw", &json!("1.5")).unwrap(), Some(json!(1.5)));
        assert_eq!(string_to_number().check("raw", &json!(42)).unwrap(), Some(json!(42)));
    }

    #[test]
    fn string_to_number_propagates_can_accept_failure() {
        let err = string_to_number().assert("raw", Some(&json!("abc"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected raw to be a finite number string; received string(abc)"
        );
    }

    #[test]
    fn string_to_integer_handles_signs() {
        assert_eq!(string_to_integer().check("i", &json!("-17")).unwrap(), Some(json!(-17)));
        assert!(string_to_integer().assert("i", Some(&json!("1.5"))).is_err());
        assert!(string_to_integer().assert("i", Some(&json!(1.5))).is_err());
    }

    #[test]
    fn string_to_natural_number_rejects_negative_text() {
        assert_eq!(string_to_natural_number().check("n", &json!("8")).unwrap(), Some(json!(8)));
        assert!(string_to_natural_number().assert("n", Some(&json!("-8"))).is_err());
    }

    #[test]
    fn boolean_casts() {
        assert_eq!(string_to_boolean().check("b", &json!("TRUE")).unwrap(), Some(json!(true)));
        assert_eq!(string_to_boolean().check("b", &json!("1")).unwrap(), Some(json!(true)));
        assert_eq!(string_to_boolean().check("b", &json!("yes")).unwrap(), Some(json!(false)));
        assert_eq!(string_to_boolean().check("b", &json!(false)).unwrap(), Some(json!(false)));
        assert_eq!(number_to_boolean().check("b", &json!(0)).unwrap(), Some(json!(false)));
        assert_eq!(number_to_boolean().check("b", &json!(-3)).unwrap(), Some(json!(true)));
        assert!(number_to_boolean().assert("b", Some(&json!("1"))).is_err());
    }
}
