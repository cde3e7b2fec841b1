use std::rc::Rc;

use arbor_canonical::{
    digest_value, from_json, to_json, Canonicalizer, ConvertError, Digest, DigestAlg, Opaque,
    TagName, TypeTag, ValidationError, Value,
};
use serde_json::json;

#[test]
fn digest_serializes_to_golden_json() {
    let digest = Digest {
        alg: DigestAlg::Sha256,
        b64: "Zm9vYmFy".into(),
    };
    assert_eq!(
        serde_json::to_string(&digest).unwrap(),
        r#"{"alg":"sha-256","b64":"Zm9vYmFy"}"#
    );
}

#[test]
fn digest_validates_its_base64_form() {
    assert!(Digest::new(DigestAlg::Sha256, "A".repeat(43)).is_ok());
    let err = Digest::new(DigestAlg::Sha256, "too-short").unwrap_err();
    assert!(matches!(
        err,
        ValidationError::PatternMismatch { field: "digest", .. }
    ));
}

#[test]
fn json_trees_round_trip_through_admission() {
    let tag = TypeTag::new();
    let first = from_json(&json!({"b": 1, "a": [true, null, "x"]}), &tag);
    let second = from_json(&json!({"a": [true, null, "x"], "b": 1}), &tag);

    let mut engine = Canonicalizer::new();
    let canonical_first = engine.admit(first);
    let canonical_second = engine.admit(second);
    assert!(Rc::ptr_eq(&canonical_first, &canonical_second));

    assert_eq!(
        to_json(&canonical_first).unwrap(),
        json!({"a": [true, null, "x"], "b": 1})
    );
}

#[test]
fn integral_numbers_survive_the_round_trip_as_integers() {
    let tag = TypeTag::new();
    let value = from_json(&json!([1, -7, 2.5]), &tag);
    assert_eq!(to_json(&value).unwrap(), json!([1, -7, 2.5]));
}

#[test]
fn non_finite_numbers_have_no_json_form() {
    let tag = TypeTag::new();
    let mut engine = Canonicalizer::new();
    let value = engine.admit(from_json(&json!({"a": [1]}), &tag));

    // Rebuild the same shape with a NaN leaf and check the reported path.
    let nan_leaf = {
        let mut object = arbor_canonical::ObjectValue::new(tag);
        object.insert("a", Rc::new(Value::Array(vec![Rc::new(Value::Number(f64::NAN))])));
        Value::Object(object)
    };
    let err = to_json(&nan_leaf).unwrap_err();
    assert_eq!(err.to_string(), "non-finite number at a[0]");
    assert!(matches!(err, ConvertError::NonFiniteNumber(_)));

    // The finite variant converts fine.
    assert_eq!(to_json(&value).unwrap(), json!({"a": [1]}));
}

#[test]
fn opaque_values_have_no_json_form() {
    let err = to_json(&Value::Opaque(Opaque::new("not json"))).unwrap_err();
    assert_eq!(err.to_string(), "opaque value at root cannot be represented as JSON");
}

#[test]
fn deeply_equal_values_digest_identically() {
    let tag = TypeTag::new();
    let forward = from_json(&json!({"a": 1, "b": [2, 3]}), &tag);
    let reversed = from_json(&json!({"b": [2, 3], "a": 1}), &tag);
    let different = from_json(&json!({"a": 1, "b": [2, 4]}), &tag);

    let lhs = digest_value(&forward).unwrap();
    let rhs = digest_value(&reversed).unwrap();
    assert_eq!(lhs, rhs);
    assert_eq!(lhs.alg, DigestAlg::Sha256);
    assert_eq!(lhs.b64.len(), 43);
    assert_ne!(lhs, digest_value(&different).unwrap());
}

#[test]
fn digesting_an_opaque_value_fails() {
    assert!(digest_value(&Value::Opaque(Opaque::new(1u8))).is_err());
}

#[test]
fn tag_names_follow_the_identifier_pattern() {
    assert!(TagName::parse("geo.Point").is_ok());
    let err = TagName::parse("9bad").unwrap_err();
    assert_eq!(err.to_string(), "TagName ('9bad') is not allowed");
}

#[test]
fn stats_report_matches_expected_shape() {
    let engine = Canonicalizer::new();
    let serialized = serde_json::to_value(engine.stats()).unwrap();
    assert_eq!(
        serialized,
        json!({
            "live_representatives": 0,
            "pool_nodes": 1,
            "key_signatures": 0
        })
    );
}
