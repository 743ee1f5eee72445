//! Validating into structured values.
//!
//! A field can be declared either with a plain validator or with a type that
//! knows how to build itself from raw input (`Structured`). `Assertion`
//! holds one or the other and `assertion` turns either into a validator, so
//! callers never need to know which form a field uses.
//!
//! A `Structured` type acquires its field values only through `Fields`,
//! which validates each value before handing it out.
//!
//! # Examples
//!
//! ```rust,ignore
//! struct Item { id: u64, name: String, tags: Vec<String> }
//!
//! impl Structured for Item {
//!     fn from_raw(name: &str, mixed: Mixed<'_>) -> Result<Self, AssertError> {
//!         let fields = Fields::new(name, mixed)?;
//!         Ok(Self {
//!             id: fields.get("id", &string_to_natural_number())?,
//!             name: fields.get("name", &string())?,
//!             tags: fields.get("tags", &array(string()))?,
//!         })
//!     }
//!
//!     fn to_raw(&self) -> Value {
//!         json!({ "id": self.id, "name": self.name, "tags": self.tags })
//!     }
//! }
//!
//! let v = assertion(Assertion::structured::<Item>());
//! ```

use std::borrow::Cow;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Assert, AssertExt, DynAssert, Mixed, Refined};
use crate::error::AssertError;

/// A type that builds itself from raw input and can be turned back into raw
/// form.
pub trait Structured: Sized {
    fn from_raw(name: &str, mixed: Mixed<'_>) -> Result<Self, AssertError>;

    fn to_raw(&self) -> Value;
}

/// Validates by constructing `T`, then returns `T`'s raw form.
pub struct Nested<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Nested<T> {
    fn clone(&self) -> Self {
        nested()
    }
}

impl<T: Structured> Assert for Nested<T> {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        construct::<T>(name, mixed).map(|raw| Some(Cow::Owned(raw)))
    }
}

pub fn nested<T>() -> Nested<T> {
    Nested {
        _marker: PhantomData,
    }
}

fn construct<T: Structured>(name: &str, mixed: Mixed<'_>) -> Result<Value, AssertError> {
    T::from_raw(name, mixed).map(|value| value.to_raw())
}

/// Structured form for serde types: decode into `T`, encode back.
pub struct Decoded<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Decoded<T> {
    fn clone(&self) -> Self {
        Decoded {
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned + Serialize> Assert for Decoded<T> {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        let value = mixed.cloned().unwrap_or(Value::Null);
        let typed: T = serde_json::from_value(value).map_err(|e| AssertError::custom(name, e.to_string()))?;
        let raw = serde_json::to_value(&typed).map_err(|e| AssertError::custom(name, e.to_string()))?;
        Ok(Some(Cow::Owned(raw)))
    }
}

pub fn decoded<T: DeserializeOwned + Serialize>() -> Decoded<T> {
    Decoded {
        _marker: PhantomData,
    }
}

/// Builds a structured value's raw form from raw input.
pub type Constructor = fn(&str, Mixed<'_>) -> Result<Value, AssertError>;

/// Either form a field validator can take.
#[derive(Clone)]
pub enum Assertion {
    /// Construct-and-populate a structured target.
    Structured(Constructor),
    /// A plain validator.
    Func(DynAssert),
}

impl Assertion {
    pub fn structured<T: Structured>() -> Self {
        Assertion::Structured(construct::<T>)
    }

    pub fn func<A: Assert + 'static>(assert: A) -> Self {
        Assertion::Func(assert.into_dyn())
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Assertion::Structured(_))
    }
}

impl Assert for Assertion {
    fn assert<'a>(&self, name: &str, mixed: Mixed<'a>) -> Result<Refined<'a>, AssertError> {
        match self {
            Assertion::Structured(ctor) => ctor(name, mixed).map(|raw| Some(Cow::Owned(raw))),
            Assertion::Func(assert) => assert.assert(name, mixed),
        }
    }
}

/// The validator for either form. A plain validator is returned as is; a
/// structured one is dispatched through its constructor.
pub fn assertion(assertion: Assertion) -> DynAssert {
    match assertion {
        Assertion::Func(assert) => assert,
        structured @ Assertion::Structured(_) => structured.into_dyn(),
    }
}

/// Validated read access to an object's fields.
pub struct Fields<'a> {
    name: String,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(name: &str, mixed: Mixed<'a>) -> Result<Self, AssertError> {
        match mixed {
            Some(Value::Object(map)) => Ok(Self {
                name: name.to_string(),
                map,
            }),
            _ => Err(AssertError::mismatch(name, "an object", mixed)),
        }
    }

    fn field_name(&self, key: &str) -> String {
        format!("{}.{key}", self.name)
    }

    /// Validate `key` with `assert` and decode the result into `T`.
    pub fn get<T, A>(&self, key: &str, assert: &A) -> Result<T, AssertError>
    where
        T: DeserializeOwned,
        A: Assert + 'static,
    {
        assert.assert_as(&self.field_name(key), self.map.get(key))
    }

    /// Build a nested structured value from `key`.
    pub fn nested<T: Structured>(&self, key: &str) -> Result<T, AssertError> {
        T::from_raw(&self.field_name(key), self.map.get(key))
    }

    /// Validate `key` and keep the refined raw value.
    pub fn raw<A: Assert + ?Sized>(&self, key: &str, assert: &A) -> Result<Option<Value>, AssertError> {
        Ok(assert
            .assert(&self.field_name(key), self.map.get(key))?
            .map(Cow::into_owned))
    }
}
