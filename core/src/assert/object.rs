//! Validators that take an object apart and build a new one.
//!
//! `rename`, `derive`, `derive_from` and `field` each produce a small object
//! holding the keys they are responsible for; `merge` runs several of them
//! against the same input and joins their outputs into one object:
//!
//! ```rust,ignore
//! let item = merge(vec![
//!     field("name", string()).into_dyn(),
//!     rename("unit_price", "price", string_to_number()).into_dyn(),
//!     derive_from("created", "created_at", natural_number(), millis_to_date, date()).into_dyn(),
//! ]);
//! ```

use std::borrow::Cow;

use serde_json::{Map, Value};

use super::combinator::{cast, Cast};
use super::{Assert, AssertExt, DynAssert, Kind, Mixed, Refined};
use crate::error::AssertError;

fn expect_object<'a>(
    name: &str,
    mixed: Mixed<'a>,
) -> Result<(&'a Value, &'a Map<String, Value>), AssertError> {
    match mixed {
        Some(value @ Value::Object(map)) => Ok((value, map)),
        _ => Err(AssertError::mismatch(name, "an object", mixed)),
    }
}

fn single<'a>(key: &str, refined: Refined<'_>) -> Refined<'a> {
    let mut out = Map::new();
    if let Some(value) = refined {
        out.insert(key.to_string(), value.into_owned());
    }
    Some(Cow::Owned(Value::Object(out)))
}

/// Reads `from` (or `to`, when `from` is absent) and outputs it as `to`.
#[derive(Clone)]
pub struct Rename {
    from: String,
    to: String,
    inner: DynAssert,
}

impl Assert for Rename {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let (_, map) = expect_object(name, mixed)?;
        let (key, source) = match map.get(&self.from) {
            Some(value) => (&self.from, Some(value)),
            None => (&self.to, map.get(&self.to)),
        };
        let refined = self.inner.assert(&format!("{name}.{key}"), source)?;
        Ok(single(&self.to, refined))
    }
}

pub fn rename<A: Assert + 'static>(from: &str, to: &str, inner: A) -> Rename {
    Rename {
        from: from.to_string(),
        to: to.to_string(),
        inner: inner.into_dyn(),
    }
}

/// `rename(key, key, inner)`: validate one field and keep its name.
pub fn field<A: Assert + 'static>(key: &str, inner: A) -> Rename {
    rename(key, key, inner)
}

/// Validates `from` and outputs the result as `to`; the source key is
/// dropped.
#[derive(Clone)]
pub struct Derive {
    from: String,
    to: String,
    inner: DynAssert,
}

impl Assert for Derive {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let (_, map) = expect_object(name, mixed)?;
        let refined = self
            .inner
            .assert(&format!("{name}.{}", self.from), map.get(&self.from))?;
        Ok(single(&self.to, refined))
    }
}

pub fn derive<A: Assert + 'static>(from: &str, to: &str, inner: A) -> Derive {
    Derive {
        from: from.to_string(),
        to: to.to_string(),
        inner: inner.into_dyn(),
    }
}

/// Keeps `from` and adds `to`, computed from `from` with the cast protocol.
#[derive(Clone)]
pub struct DeriveFrom {
    from: String,
    to: String,
    can_cast: DynAssert,
    cast: Cast,
}

impl Assert for DeriveFrom {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let (_, map) = expect_object(name, mixed)?;
        let source_name = format!("{name}.{}", self.from);
        let source = map.get(&self.from);
        let derived = self.cast.assert(&source_name, source)?;
        // A source already in target form skipped the cast and may not pass
        // `can_cast`; it is kept as given.
        let kept = self
            .can_cast
            .assert(&source_name, source)
            .unwrap_or_else(|_| source.map(Cow::Borrowed));

        let mut out = Map::new();
        if let Some(value) = kept {
            out.insert(self.from.clone(), value.into_owned());
        }
        if let Some(value) = derived {
            out.insert(self.to.clone(), value.into_owned());
        }
        Ok(Some(Cow::Owned(Value::Object(out))))
    }
}

pub fn derive_from<C, F, T>(from: &str, to: &str, can_cast: C, cast_fn: F, target: T) -> DeriveFrom
where
    C: Assert + 'static,
    F: Fn(&Value) -> Value + Send + Sync + 'static,
    T: Assert + 'static,
{
    let can_cast = can_cast.into_dyn();
    DeriveFrom {
        from: from.to_string(),
        to: to.to_string(),
        cast: cast(can_cast.clone(), cast_fn, target),
        can_cast,
    }
}

/// Validates every value of an open-ended mapping.
///
/// Copy-on-write like `array`: the input object comes back as is unless a
/// value changed. Values that come back absent are dropped from the copy.
#[derive(Clone)]
pub struct Dictionary {
    inner: DynAssert,
}

impl Assert for Dictionary {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let (original, map) = expect_object(name, mixed)?;
        let mut copy: Option<Map<String, Value>> = None;
        for (i, (key, value)) in map.iter().enumerate() {
            let refined = self.inner.assert(&format!("{name}.{key}"), Some(value))?;
            if super::is_same(&refined, value) {
                if let Some(copy) = copy.as_mut() {
                    copy.insert(key.clone(), value.clone());
                }
                continue;
            }
            let copy = copy.get_or_insert_with(|| {
                map.iter()
                    .take(i)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            });
            if let Some(refined) = refined {
                copy.insert(key.clone(), refined.into_owned());
            }
        }
        Ok(Some(match copy {
            Some(copy) => Cow::Owned(Value::Object(copy)),
            None => Cow::Borrowed(original),
        }))
    }
}

pub fn dictionary<A: Assert + 'static>(inner: A) -> Dictionary {
    Dictionary {
        inner: inner.into_dyn(),
    }
}

/// Accepts only values of one runtime kind.
#[derive(Debug, Clone, Copy)]
pub struct InstanceOf {
    kind: Kind,
}

impl Assert for InstanceOf {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        if Kind::of(mixed) == self.kind {
            Ok(mixed.map(Cow::Borrowed))
        } else {
            Err(AssertError::mismatch(name, format!("an instance of {}", self.kind), mixed))
        }
    }
}

pub fn instance_of(kind: Kind) -> InstanceOf {
    InstanceOf { kind }
}

/// Accepts only `{}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyObject;

impl Assert for EmptyObject {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match mixed {
            Some(value @ Value::Object(map)) if map.is_empty() => Ok(Some(Cow::Borrowed(value))),
            _ => Err(AssertError::mismatch(name, "an empty object", mixed)),
        }
    }
}

pub fn empty_object() -> EmptyObject {
    EmptyObject
}

/// Runs each validator on the same input and merges their object outputs,
/// later keys overwriting earlier ones.
#[derive(Clone)]
pub struct Merge {
    parts: Vec<DynAssert>,
}

impl Merge {
    #[must_use]
    pub fn with<A: Assert + 'static>(mut self, part: A) -> Self {
        self.parts.push(part.into_dyn());
        self
    }
}

impl Assert for Merge {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        expect_object(name, mixed)?;
        let mut merged = Map::new();
        for part in &self.parts {
            match part.assert(name, mixed)?.map(Cow::into_owned) {
                Some(Value::Object(map)) => merged.extend(map),
                None => {}
                Some(other) => {
                    return Err(AssertError::custom(
                        name,
                        format!("merged validators must produce objects, got {}", Kind::of(Some(&other))),
                    ))
                }
            }
        }
        Ok(Some(Cow::Owned(Value::Object(merged))))
    }
}

pub fn merge(parts: Vec<DynAssert>) -> Merge {
    Merge { parts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert::{
        date, integer, is_same, natural_number, optional, string, string_to_boolean,
        string_to_number,
    };
    use serde_json::json;

    #[test]
    fn rename_moves_key() {
        let v = rename("user_id", "userId", integer());
        assert_eq!(v.check("raw", &json!({"user_id": 3})).unwrap(), Some(json!({"userId": 3})));
        // Already renamed input is accepted too.
        assert_eq!(v.check("raw", &json!({"userId": 4})).unwrap(), Some(json!({"userId": 4})));
    }

    #[test]
    fn rename_error_names_source_key() {
        let err = rename("user_id", "userId", integer())
            .assert("raw", Some(&json!({"user_id": "x"})))
            .unwrap_err();
        assert_eq!(err.name(), "raw.user_id");
    }

    #[test]
    fn rename_drops_absent_optional() {
        let v = rename("a", "b", optional(string()));
        assert_eq!(v.check("raw", &json!({})).unwrap(), Some(json!({})));
    }

    #[test]
    fn derive_drops_source() {
        let v = derive("active", "isActive", string_to_boolean());
        assert_eq!(
            v.check("raw", &json!({"active": "true", "other": 1})).unwrap(),
            Some(json!({"isActive": true}))
        );
    }

    #[test]
    fn derive_from_keeps_source() {
        let v = derive_from(
            "created",
            "createdAt",
            natural_number(),
            |ms: &Value| ms.clone(),
            date(),
        );
        let out = v.check("raw", &json!({"created": 0})).unwrap();
        assert_eq!(
            out,
            Some(json!({"created": 0, "createdAt": "1970-01-01T00:00:00.000Z"}))
        );
    }

    #[test]
    fn dictionary_copy_on_write() {
        let input = json!({"a": 1, "b": 2});
        let out = dictionary(integer()).assert("d", Some(&input)).unwrap();
        assert!(is_same(&out, &input));

        let input = json!({"a": 1, "b": "2"});
        let out = dictionary(string_to_number()).check("d", &input).unwrap();
        assert_eq!(out, Some(json!({"a": 1, "b": 2})));

        let err = dictionary(integer()).assert("d", Some(&json!({"k": "v"}))).unwrap_err();
        assert_eq!(err.name(), "d.k");
    }

    #[test]
    fn instance_of_checks_kind() {
        assert!(instance_of(Kind::Array).assert("x", Some(&json!([]))).is_ok());
        let err = instance_of(Kind::Array).assert("x", Some(&json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Expected x to be an instance of array; received object");
    }

    #[test]
    fn empty_object_only() {
        assert!(empty_object().assert("x", Some(&json!({}))).is_ok());
        assert!(empty_object().assert("x", Some(&json!({"a": 1}))).is_err());
        assert!(empty_object().assert("x", Some(&json!([]))).is_err());
    }

    #[test]
    fn merge_combines_shapes() {
        let v = merge(vec![
            field("name", string()).into_dyn(),
            rename("unit_price", "price", string_to_number()).into_dyn(),
        ]);
        let out = v
            .check("item", &json!({"name": "pen", "unit_price": "1.25", "extra": true}))
            .unwrap();
        assert_eq!(out, Some(json!({"name": "pen", "price": 1.25})));
    }

    #[test]
    fn merge_rejects_non_object_parts() {
        let v = merge(vec![field("name", string()).into_dyn()]).with(string());
        assert!(v.assert("item", Some(&json!({"name": "x"}))).is_err());
    }
}
