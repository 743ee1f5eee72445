//! Composable runtime assertions over JSON values.
//!
//! # Design
//! A validator takes a field name and a raw value and either returns the
//! refined value or fails with an `AssertError` naming the field. Raw input
//! is borrowed (`Mixed`), so a validator cannot mutate what it was given.
//! The result is a `Cow`: `Borrowed` means "exactly the input", `Owned`
//! means a new value was produced. Combinators such as `array` rely on that
//! distinction to return the original array when nothing changed.
//!
//! `None` on either side stands for an absent value ("undefined"), which is
//! distinct from JSON `null`.
//!
//! Validators compose either through free functions (`or`, `and`, `cast`,
//! `array`, ...) or through the `AssertExt` methods available on every
//! validator.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AssertError;

pub mod cast;
pub mod combinator;
pub mod nested;
pub mod object;
pub mod primitive;

pub use cast::{
    finite_number_string, integer_string, natural_number_string, number_to_boolean,
    string_to_boolean, string_to_integer, string_to_natural_number, string_to_number,
};
pub use combinator::{and, array, cast, maybe, nullable, optional, or, And, Array, Cast, Or};
pub use nested::{assertion, decoded, nested, Assertion, Decoded, Fields, Nested, Structured};
pub use object::{
    derive, derive_from, dictionary, empty_object, field, instance_of, merge, rename, Merge,
};
pub use primitive::{
    any, boolean, date, enumeration, integer, natural_number, nil, number, one_of, string, undef,
};

/// A raw value as handed to a validator. `None` is an absent value.
pub type Mixed<'a> = Option<&'a Value>;

/// A validator's result. `None` is an absent value.
pub type Refined<'a> = Option<Cow<'a, Value>>;

/// A shareable, type-erased validator.
pub type DynAssert = Arc<dyn Assert>;

/// Checks and refines a raw value.
pub trait Assert: Send + Sync {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError>;
}

impl<A: Assert + ?Sized> Assert for Arc<A> {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        (**self).assert(name, mixed)
    }
}

impl<A: Assert + ?Sized> Assert for Box<A> {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        (**self).assert(name, mixed)
    }
}

impl<A: Assert + ?Sized> Assert for &A {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        (**self).assert(name, mixed)
    }
}

/// A validator written as a plain function.
///
/// The function always produces an owned result, so wrappers like `array`
/// treat its output as changed.
pub struct FnAssert<F> {
    f: F,
}

impl<F> Assert for FnAssert<F>
where
    F: Fn(&str, Mixed<'_>) -> Result<Option<Value>, AssertError> + Send + Sync,
{
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        Ok((self.f)(name, mixed)?.map(Cow::Owned))
    }
}

/// Wrap a plain function as a validator.
///
/// ```rust,ignore
/// let even = from_fn(|name, mixed| match mixed.and_then(Value::as_i64) {
///     Some(n) if n % 2 == 0 => Ok(Some(Value::from(n))),
///     _ => Err(AssertError::mismatch(name, "an even integer", mixed)),
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnAssert<F>
where
    F: Fn(&str, Mixed<'_>) -> Result<Option<Value>, AssertError> + Send + Sync,
{
    FnAssert { f }
}

/// Combinator methods available on every validator.
pub trait AssertExt: Assert + Sized + 'static {
    /// Type-erase into a shareable validator.
    fn into_dyn(self) -> DynAssert {
        Arc::new(self)
    }

    /// Try `self`, then `other`.
    fn or<B: Assert + 'static>(self, other: B) -> Or {
        Or::new(vec![self.into_dyn(), other.into_dyn()])
    }

    /// Feed the output of `self` into `other`.
    fn and<B: Assert + 'static>(self, other: B) -> And {
        And::new(vec![self.into_dyn(), other.into_dyn()])
    }

    fn optional(self) -> Or {
        optional(self)
    }

    fn nullable(self) -> Or {
        nullable(self)
    }

    fn maybe(self) -> Or {
        maybe(self)
    }

    /// Validate a present value and return an owned result.
    fn check(&self, name: &str, value: &Value) -> Result<Option<Value>, AssertError> {
        Ok(self.assert(name, Some(value))?.map(Cow::into_owned))
    }

    /// Validate, then decode the refined value into `T`.
    ///
    /// An absent result decodes from `null`, so `Option<T>` targets see
    /// `None`.
    fn assert_as<T: DeserializeOwned>(&self, name: &str, mixed: Mixed<'_>) -> Result<T, AssertError> {
        let refined = self.assert(name, mixed)?;
        let value = refined.map_or(Value::Null, Cow::into_owned);
        serde_json::from_value(value).map_err(|e| AssertError::custom(name, e.to_string()))
    }
}

impl<A: Assert + Sized + 'static> AssertExt for A {}

/// Runtime kind of a raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    pub fn of(mixed: Mixed<'_>) -> Self {
        match mixed {
            None => Kind::Undefined,
            Some(Value::Null) => Kind::Null,
            Some(Value::Bool(_)) => Kind::Boolean,
            Some(Value::Number(_)) => Kind::Number,
            Some(Value::String(_)) => Kind::String,
            Some(Value::Array(_)) => Kind::Array,
            Some(Value::Object(_)) => Kind::Object,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Undefined => "undefined",
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        };
        f.write_str(s)
    }
}

/// True when `refined` is the very value that was passed in.
pub(crate) fn is_same(refined: &Refined<'_>, original: &Value) -> bool {
    matches!(refined, Some(Cow::Borrowed(v)) if std::ptr::eq(*v, original))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_fn_output_is_owned() {
        let double = from_fn(|name, mixed| match mixed.and_then(Value::as_i64) {
            Some(n) => Ok(Some(Value::from(n * 2))),
            None => Err(AssertError::mismatch(name, "an integer", mixed)),
        });
        let input = json!(4);
        let out = double.assert("n", Some(&input)).unwrap();
        assert!(matches!(out, Some(Cow::Owned(_))));
        assert_eq!(out.unwrap().into_owned(), json!(8));
    }

    #[test]
    fn assert_as_decodes_typed_values() {
        let input = json!(["1", "2", "3"]);
        let nums: Vec<u32> = array(string_to_natural_number()).assert_as("ids", Some(&input)).unwrap();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[test]
    fn assert_as_reports_decode_failures_with_name() {
        let input = json!("abc");
        let err = string().assert_as::<u32>("id", Some(&input)).unwrap_err();
        assert_eq!(err.name(), "id");
    }

    #[test]
    fn assert_as_absent_decodes_to_none() {
        let out: Option<String> = string().optional().assert_as("x", None).unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn dyn_assert_is_usable_behind_arc() {
        let v: DynAssert = integer().into_dyn();
        let input = json!(7);
        assert_eq!(v.check("n", &input).unwrap(), Some(json!(7)));
    }

    #[test]
    fn kind_of_values() {
        assert_eq!(Kind::of(None), Kind::Undefined);
        assert_eq!(Kind::of(Some(&json!(null))), Kind::Null);
        assert_eq!(Kind::of(Some(&json!({}))), Kind::Object);
        assert_eq!(Kind::Array.to_string(), "array");
    }
}
