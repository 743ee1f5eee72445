//! Runs the shared validator vectors in `test-vectors/assert.json`.

use api_assert::assert::{
    any, array, boolean, date, enumeration, integer, maybe, natural_number, nil, nullable, number,
    number_to_boolean, one_of, optional, or, string, string_to_boolean, string_to_integer,
    string_to_natural_number, string_to_number,
};
use api_assert::{Assert, AssertExt, DynAssert};
use serde_json::json;

fn validator(name: &str) -> DynAssert {
    match name {
        "boolean" => boolean().into_dyn(),
        "number" => number().into_dyn(),
        "integer" => integer().into_dyn(),
        "natural_number" => natural_number().into_dyn(),
        "string" => string().into_dyn(),
        "date" => date().into_dyn(),
        "nil" => nil().into_dyn(),
        "any" => any().into_dyn(),
        "string_to_number" => string_to_number().into_dyn(),
        "string_to_integer" => string_to_integer().into_dyn(),
        "string_to_natural_number" => string_to_natural_number().into_dyn(),
        "string_to_boolean" => string_to_boolean().into_dyn(),
        "number_to_boolean" => number_to_boolean().into_dyn(),
        "array(integer)" => array(integer()).into_dyn(),
        "optional(string)" => optional(string()).into_dyn(),
        "nullable(string)" => nullable(string()).into_dyn(),
        "maybe(string)" => maybe(string()).into_dyn(),
        "enumeration(status)" => enumeration(&json!({"A": 0, "B": 1, "0": "A", "1": "B"})).into_dyn(),
        "or(one_of(a), one_of(b))" => or(one_of(["a"]), one_of(["b"])).into_dyn(),
        other => panic!("unknown validator in vectors: {other}"),
    }
}

#[test]
fn assert_test_vectors() {
    let raw = include_str!("../../test-vectors/assert.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let v = validator(case["validator"].as_str().unwrap());
        let input = case.get("input");
        let before = input.cloned();

        let result = v.assert("x", input);

        if let Some(expected_error) = case.get("error") {
            let err = result.err().unwrap_or_else(|| panic!("{name}: expected an error"));
            assert_eq!(err.to_string(), expected_error.as_str().unwrap(), "{name}: message");
        } else {
            let refined = result.unwrap_or_else(|e| panic!("{name}: unexpected error: {e}"));
            let output = refined.map(|r| r.into_owned());
            if case.get("expected_absent").is_some() {
                assert_eq!(output, None, "{name}: expected absent");
            } else {
                assert_eq!(output.as_ref(), case.get("expected"), "{name}: output");
            }
        }

        assert_eq!(input.cloned(), before, "{name}: input was modified");
    }
}
