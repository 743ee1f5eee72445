//! Combinators that build validators out of other validators.
//!
//! # Examples
//!
//! ```rust,ignore
//! use api_assert::assert::*;
//!
//! // First match wins: put specific validators before general ones.
//! let id = or(natural_number(), string_to_natural_number());
//! let ids = array(id);
//! let tags = optional(array(string()));
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;

use super::{is_same, Assert, AssertExt, DynAssert, Mixed, Refined};
use crate::error::AssertError;

/// Tries each validator in order and returns the first success.
///
/// When every branch fails the error is `AssertError::Alternatives`, whose
/// message joins all branch messages with `" or "`. No attempt is made to
/// prefer a more specific branch: the first one that accepts wins.
#[derive(Clone)]
pub struct Or {
    branches: Vec<DynAssert>,
}

impl Or {
    pub fn new(branches: Vec<DynAssert>) -> Self {
        Self { branches }
    }

    /// Appends another branch, tried after the existing ones.
    #[must_use]
    pub fn or<B: Assert + 'static>(mut self, other: B) -> Self {
        self.branches.push(other.into_dyn());
        self
    }
}

impl Assert for Or {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let mut errors = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            match branch.assert(name, mixed) {
                Ok(refined) => return Ok(refined),
                Err(e) => errors.push(e),
            }
        }
        Err(AssertError::Alternatives(errors))
    }
}

pub fn or<A, B>(first: A, second: B) -> Or
where
    A: Assert + 'static,
    B: Assert + 'static,
{
    first.or(second)
}

/// Threads the value through each validator in turn; each one sees the
/// previous one's output.
#[derive(Clone)]
pub struct And {
    steps: Vec<DynAssert>,
}

impl And {
    pub fn new(steps: Vec<DynAssert>) -> Self {
        Self { steps }
    }

    /// Appends another step, run on the output of the existing ones.
    #[must_use]
    pub fn and<B: Assert + 'static>(mut self, other: B) -> Self {
        self.steps.push(other.into_dyn());
        self
    }
}

impl Assert for And {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let mut current: Refined<'a> = mixed.map(Cow::Borrowed);
        for step in &self.steps {
            current = match current {
                None => step.assert(name, None)?,
                Some(Cow::Borrowed(value)) => step.assert(name, Some(value))?,
                Some(Cow::Owned(value)) => step
                    .assert(name, Some(&value))?
                    .map(|refined| Cow::Owned(refined.into_owned())),
            };
        }
        Ok(current)
    }
}

pub fn and<A, B>(first: A, second: B) -> And
where
    A: Assert + 'static,
    B: Assert + 'static,
{
    first.and(second)
}

/// Conversion applied by `Cast` to a value `can_accept` approved.
pub type CastFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Validate as the target first; otherwise validate as the source, convert,
/// and validate as the target once more.
///
/// A value already in target form is returned by the target validator
/// unchanged. If `can_accept` rejects the value its error is returned; if
/// the converted value still fails the target the error is
/// `AssertError::CastExhausted`.
#[derive(Clone)]
pub struct Cast {
    can_accept: DynAssert,
    cast_fn: CastFn,
    target: DynAssert,
}

impl Assert for Cast {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        if let Ok(refined) = self.target.assert(name, mixed) {
            return Ok(refined);
        }
        let from = self.can_accept.assert(name, mixed)?;
        let to = (self.cast_fn)(from.as_deref().unwrap_or(&Value::Null));
        match self.target.assert(name, Some(&to)) {
            Ok(refined) => Ok(refined.map(|r| Cow::Owned(r.into_owned()))),
            Err(e) => Err(AssertError::CastExhausted(Box::new(e))),
        }
    }
}

pub fn cast<C, F, T>(can_accept: C, cast_fn: F, target: T) -> Cast
where
    C: Assert + 'static,
    F: Fn(&Value) -> Value + Send + Sync + 'static,
    T: Assert + 'static,
{
    Cast {
        can_accept: can_accept.into_dyn(),
        cast_fn: Arc::new(cast_fn),
        target: target.into_dyn(),
    }
}

/// Validates every element of an array.
///
/// Element names are `name[i]` and the first invalid element aborts. The
/// input array is returned as is unless some element came back as a
/// different value; only then is a new array allocated, starting from the
/// first changed element.
#[derive(Clone)]
pub struct Array {
    element: DynAssert,
}

impl Assert for Array {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let Some(original @ Value::Array(items)) = mixed else {
            return Err(AssertError::mismatch(name, "an array", mixed));
        };
        let mut copy: Option<Vec<Value>> = None;
        for (i, item) in items.iter().enumerate() {
            let refined = self.element.assert(&format!("{name}[{i}]"), Some(item))?;
            if is_same(&refined, item) {
                if let Some(copy) = copy.as_mut() {
                    copy.push(item.clone());
                }
                continue;
            }
            let copy = copy.get_or_insert_with(|| {
                let mut fresh = Vec::with_capacity(items.len());
                fresh.extend_from_slice(&items[..i]);
                fresh
            });
            // An absent element has no JSON form; arrays hold `null` instead.
            copy.push(refined.map_or(Value::Null, Cow::into_owned));
        }
        Ok(Some(match copy {
            Some(copy) => Cow::Owned(Value::Array(copy)),
            None => Cow::Borrowed(original),
        }))
    }
}

pub fn array<A: Assert + 'static>(element: A) -> Array {
    Array {
        element: element.into_dyn(),
    }
}

/// Sentinel branch for `optional`, `nullable` and `maybe`: accepts an absent
/// value and/or `null`, reporting itself as a literal set.
#[derive(Debug, Clone, Copy)]
struct Blank {
    undefined: bool,
    null: bool,
}

impl Blank {
    fn expected(self) -> &'static str {
        match (self.undefined, self.null) {
            (true, true) => "one of undefined|null",
            (true, false) => "one of undefined",
            _ => "one of null",
        }
    }
}

impl Assert for Blank {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            None if self.undefined => Ok(None),
            Some(value @ Value::Null) if self.null => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, self.expected(), mixed)),
        }
    }
}

/// Accepts an absent value or whatever `inner` accepts.
pub fn optional<A: Assert + 'static>(inner: A) -> Or {
    or(Blank { undefined: true, null: false }, inner)
}

/// Accepts `null` or whatever `inner` accepts.
pub fn nullable<A: Assert + 'static>(inner: A) -> Or {
    or(Blank { undefined: false, null: true }, inner)
}

/// Accepts an absent value, `null`, or whatever `inner` accepts.
pub fn maybe<A: Assert + 'static>(inner: A) -> Or {
    or(Blank { undefined: true, null: true }, inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert::{
        boolean, integer, natural_number, number, one_of, string, string_to_number, Kind,
    };
    use serde_json::json;

    #[test]
    fn or_first_match_wins() {
        let v = or(any_string_marker(), string());
        let out = v.check("x", &json!("a")).unwrap();
        assert_eq!(out, Some(json!("marked")));
    }

    fn any_string_marker() -> impl Assert {
        crate::assert::from_fn(|name, mixed| match mixed {
            Some(Value::String(_)) => Ok(Some(json!("marked"))),
            _ => Err(AssertError::mismatch(name, "a string", mixed)),
        })
    }

    #[test]
    fn or_joins_all_branch_failures() {
        let v = or(one_of(["a"]), one_of(["b"]));
        let err = v.assert("x", Some(&json!("c"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "(Expected x to be one of a; received string(c)) or \
             (Expected x to be one of b; received string(c))"
        );
    }

    #[test]
    fn or_chain_appends_branches() {
        let v = or(boolean(), number()).or(string());
        assert!(v.assert("x", Some(&json!("s"))).is_ok());
        let err = v.assert("x", Some(&json!(null))).unwrap_err();
        match err {
            AssertError::Alternatives(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn and_threads_outputs() {
        let v = and(string_to_number(), natural_number());
        assert_eq!(v.check("n", &json!("12")).unwrap(), Some(json!(12)));
        let err = v.assert("n", Some(&json!("-12"))).unwrap_err();
        assert_eq!(err.to_string(), "Expected n to be a natural number; received number(-12)");
    }

    #[test]
    fn and_keeps_borrowed_when_nothing_changes() {
        let input = json!(5);
        let out = and(number(), integer()).assert("n", Some(&input)).unwrap();
        assert!(is_same(&out, &input));
    }

    #[test]
    fn cast_tries_target_first() {
        let v = cast(string(), |s: &Value| json!(s.as_str().map(str::len)), number());
        let input = json!(42);
        let out = v.assert("raw", Some(&input)).unwrap();
        assert!(is_same(&out, &input));
        assert_eq!(v.check("raw", &json!("abc")).unwrap(), Some(json!(3)));
    }

    #[test]
    fn cast_exhausted_when_result_still_invalid() {
        let v = cast(string(), |_: &Value| json!("still a string"), number());
        let err = v.assert("raw", Some(&json!("x"))).unwrap_err();
        assert!(matches!(err, AssertError::CastExhausted(_)));
        assert_eq!(
            err.to_string(),
            "Expected raw to be a finite number; received string(still a string)"
        );
    }

    #[test]
    fn array_returns_same_reference_when_unchanged() {
        let input = json!([1, 2, 3]);
        let out = array(integer()).assert("x", Some(&input)).unwrap();
        assert!(is_same(&out, &input));
    }

    #[test]
    fn array_of_integral_floats_is_unchanged() {
        let input = json!([1.0, 2.0]);
        let out = array(integer()).assert("x", Some(&input)).unwrap();
        assert!(is_same(&out, &input));
        assert_eq!(out.unwrap().into_owned(), input);
    }

    #[test]
    fn array_copies_when_an_element_changes() {
        let input = json!(["1", "2"]);
        let before = input.clone();
        let out = array(string_to_number()).assert("x", Some(&input)).unwrap();
        assert!(matches!(out, Some(Cow::Owned(_))));
        assert_eq!(out.unwrap().into_owned(), json!([1, 2]));
        assert_eq!(input, before);
    }

    #[test]
    fn array_copy_keeps_unchanged_prefix_and_suffix() {
        let input = json!([1, "2", 3]);
        let out = array(string_to_number()).check("x", &input).unwrap();
        assert_eq!(out, Some(json!([1, 2, 3])));
    }

    #[test]
    fn array_reports_first_bad_index() {
        let err = array(integer()).assert("ids", Some(&json!([1, "a", "b"]))).unwrap_err();
        assert_eq!(err.name(), "ids[1]");
        assert!(array(integer()).assert("ids", Some(&json!({}))).is_err());
    }

    #[test]
    fn optional_nullable_maybe() {
        assert_eq!(optional(string()).assert("x", None).unwrap(), None);
        assert!(optional(string()).assert("x", Some(&json!(null))).is_err());
        assert!(nullable(string()).assert("x", Some(&json!(null))).is_ok());
        assert!(nullable(string()).assert("x", None).is_err());
        assert!(maybe(string()).assert("x", None).is_ok());
        assert!(maybe(string()).assert("x", Some(&json!(null))).is_ok());
        assert!(maybe(string()).assert("x", Some(&json!("s"))).is_ok());
        assert_eq!(Kind::of(None), Kind::Undefined);
    }

    #[test]
    fn maybe_reports_a_single_blank_branch() {
        let err = maybe(string()).assert("x", Some(&json!(3))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "(Expected x to be one of undefined|null; received number(3)) or \
             (Expected x to be a string; received number(3))"
        );
        let err = optional(string()).assert("x", Some(&json!(null))).unwrap_err();
        assert!(err.to_string().starts_with("(Expected x to be one of undefined; received null)"));
    }

    #[test]
    fn validators_do_not_mutate_input() {
        let input = json!({"list": ["1", "2"], "n": 3.0});
        let snapshot = input.clone();
        let _ = array(string_to_number()).assert("list", input.get("list"));
        let _ = integer().assert("n", input.get("n"));
        assert_eq!(input, snapshot);
    }
}
