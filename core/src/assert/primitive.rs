//! Leaf validators: booleans, numbers, strings, dates, sentinels and
//! literal sets.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::{Assert, Mixed, Refined};
use crate::error::AssertError;

/// Accepts JSON booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl Assert for Boolean {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::Bool(_)) => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "a boolean", mixed)),
        }
    }
}

pub fn boolean() -> Boolean {
    Boolean
}

/// Accepts any JSON number. JSON cannot encode NaN or infinities, so every
/// number is finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Number;

impl Assert for Number {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::Number(_)) => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "a finite number", mixed)),
        }
    }
}

pub fn number() -> Number {
    Number
}

/// Accepts numbers without a fractional part.
///
/// Integral floats such as `3.0` are normalised to the integer `3` so that
/// typed decoding into integer types succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl Assert for Integer {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        integral(name, mixed, "an integer")
    }
}

pub fn integer() -> Integer {
    Integer
}

/// Accepts integers `>= 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalNumber;

impl Assert for NaturalNumber {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let refined = integral(name, mixed, "a natural number")?;
        let non_negative = refined
            .as_deref()
            .and_then(Value::as_f64)
            .is_some_and(|n| n >= 0.0);
        if non_negative {
            Ok(refined)
        } else {
            Err(AssertError::mismatch(name, "a natural number", mixed))
        }
    }
}

pub fn natural_number() -> NaturalNumber {
    NaturalNumber
}

fn integral<'a>(name: &str, mixed: Mixed<'a>, expected: &str) -> Result<Refined<'a>, AssertError> {
    match mixed {
        Some(value @ Value::Number(n))
            if n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0) =>
        {
            Ok(Some(Cow::Borrowed(value)))
        }
        _ => Err(AssertError::mismatch(name, expected, mixed)),
    }
}

/// JSON number for `f`, preferring the integer representation when `f` is
/// integral and fits `i64`. Non-finite input yields `null`.
pub(crate) fn number_value(f: f64) -> Value {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f >= -I64_BOUND && f < I64_BOUND {
        return Value::from(f as i64);
    }
    serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// Accepts JSON strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Str;

impl Assert for Str {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::String(_)) => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "a string", mixed)),
        }
    }
}

pub fn string() -> Str {
    Str
}

/// Accepts a date string or a millisecond timestamp and normalises it to an
/// RFC 3339 UTC string with millisecond precision.
///
/// Accepted strings: RFC 3339 (`2024-01-02T03:04:05+01:00`), a naive
/// date-time taken as UTC (`2024-01-02T03:04:05.678`) and a bare date
/// (`2024-01-02`, midnight UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct Date;

impl Assert for Date {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let parsed = match mixed {
            Some(Value::String(s)) => parse_date_str(s),
            Some(Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .and_then(|f| DateTime::<Utc>::from_timestamp_millis(f.trunc() as i64)),
            _ => {
                return Err(AssertError::mismatch(
                    name,
                    "a Date, Date string, or Date number",
                    mixed,
                ))
            }
        };
        match parsed {
            Some(date) => Ok(Some(Cow::Owned(Value::String(
                date.to_rfc3339_opts(SecondsFormat::Millis, true),
            )))),
            None => Err(AssertError::mismatch(name, "a valid Date", mixed)),
        }
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn date() -> Date {
    Date
}

/// Accepts only `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nil;

impl Assert for Nil {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::Null) => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "null", mixed)),
        }
    }
}

pub fn nil() -> Nil {
    Nil
}

/// Accepts only an absent value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Undef;

impl Assert for Undef {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            None => Ok(None),
            Some(_) => Err(AssertError::mismatch(name, "undefined", mixed)),
        }
    }
}

pub fn undef() -> Undef {
    Undef
}

/// Accepts everything, unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyValue;

impl Assert for AnyValue {
    fn assert<'a>(&self, _name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        Ok(mixed.map(Cow::Borrowed))
    }
}

pub fn any() -> AnyValue {
    AnyValue
}

/// Accepts a value strictly equal to one of a fixed set of literals.
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf {
    values: Vec<Value>,
}

impl OneOf {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn expected(&self) -> String {
        let rendered: Vec<String> = self
            .values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("one of {}", rendered.join("|"))
    }
}

impl Assert for OneOf {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        if let Some(value) = mixed {
            if self.values.iter().any(|literal| strict_eq(literal, value)) {
                return Ok(Some(Cow::Borrowed(value)));
            }
        }
        Err(AssertError::mismatch(name, self.expected(), mixed))
    }
}

/// Equality between literals. Numbers compare by value, so `1` equals `1.0`.
fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

pub fn one_of<I, V>(values: I) -> OneOf
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    OneOf {
        values: values.into_iter().map(Into::into).collect(),
    }
}

/// Literal set derived from an enum-like mapping.
///
/// Keys beginning with a digit are reverse mappings (`"0": "A"`) and are
/// skipped, as are values that are neither strings nor numbers. A mapping
/// that is not an object accepts nothing.
pub fn enumeration(e: &Value) -> OneOf {
    let values = match e {
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !key.starts_with(|c: char| c.is_ascii_digit()))
            .map(|(_, value)| value)
            .filter(|value| value.is_string() || value.is_number())
            .cloned()
            .collect(),
        _ => Vec::new(),
    };
    OneOf { values }
}
