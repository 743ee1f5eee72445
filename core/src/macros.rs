/// Alternation over any number of validators; first match wins.
///
/// ```rust,ignore
/// let id = or![natural_number(), string_to_natural_number(), nil()];
/// ```
#[macro_export]
macro_rules! or {
    ($($assert:expr),+ $(,)?) => {
        $crate::assert::Or::new(vec![$($crate::assert::AssertExt::into_dyn($assert)),+])
    };
}

/// Conjunction over any number of validators, each seeing the previous
/// one's output.
#[macro_export]
macro_rules! and {
    ($($assert:expr),+ $(,)?) => {
        $crate::assert::And::new(vec![$($crate::assert::AssertExt::into_dyn($assert)),+])
    };
}

/// Merge the object outputs of several shaping validators.
///
/// ```rust,ignore
/// let item = merge![field("name", string()), rename("unit_price", "price", string_to_number())];
/// ```
#[macro_export]
macro_rules! merge {
    ($($assert:expr),+ $(,)?) => {
        $crate::assert::merge(vec![$($crate::assert::AssertExt::into_dyn($assert)),+])
    };
}
