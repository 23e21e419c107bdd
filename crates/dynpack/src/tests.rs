use crate::*;

fn parse(text: &str) -> Value {
    serde_json::from_str(text).expect("valid json")
}

// ============================================================================
//  JSON MAPPING
// ============================================================================

#[test]
fn test_scalars_from_json() {
    assert_eq!(parse("null"), Value::Null);
    assert_eq!(parse("true"), Value::Bool(true));
    assert_eq!(parse("-17"), Value::Int(-17));
    assert_eq!(parse("2.5"), Value::Float(2.5));
    assert_eq!(parse("\"hi\""), Value::Str("hi".into()));
}

#[test]
fn test_integer_literal_with_fraction_is_float() {
    assert_eq!(parse("3.0"), Value::Float(3.0));
    assert_eq!(parse("1e3"), Value::Float(1000.0));
}

#[test]
fn test_large_unsigned_becomes_float() {
    let v = parse("18446744073709551615");
    assert_eq!(v, Value::Float(u64::MAX as f64));
    assert_eq!(parse("9223372036854775807"), Value::Int(i64::MAX));
}

#[test]
fn test_containers_from_json() {
    let v = parse(r#"{"Name": "Guobin", "Hobbies": ["go", 1, null], "Address": {}}"#);
    let expected = Value::map([
        ("Name", Value::from("Guobin")),
        ("Hobbies", Value::Seq(vec![Value::from("go"), Value::Int(1), Value::Null])),
        ("Address", Value::Map(Map::new())),
    ]);
    assert_eq!(v, expected);
}

#[test]
fn test_serialize_is_plain_json() {
    let v = Value::map([
        ("a", Value::seq([1i64, 2, 3])),
        ("b", Value::Null),
        ("c", Value::Float(0.5)),
    ]);
    let text = serde_json::to_string(&v).unwrap();
    assert_eq!(text, r#"{"a":[1,2,3],"b":null,"c":0.5}"#);
    assert_eq!(parse(&text), v);
}

#[test]
fn test_map_key_order_is_irrelevant() {
    assert_eq!(parse(r#"{"x": 1, "y": 2}"#), parse(r#"{"y": 2, "x": 1}"#));
}

// ============================================================================
//  ACCESSORS & CONVERSIONS
// ============================================================================

#[test]
fn test_accessors() {
    let v = Value::map([("ID", Value::Int(7))]);
    assert_eq!(v.get("ID").and_then(Value::as_i64), Some(7));
    assert_eq!(v.get("missing"), None);
    assert_eq!(Value::Int(2).as_f64(), Some(2.0));
    assert_eq!(Value::from("x").as_str(), Some("x"));
    assert!(Value::Str("x".into()).as_i64().is_none());
    assert!(Value::default().is_null());
}

#[test]
fn test_kind_names() {
    assert_eq!(Value::Null.kind_name(), "null");
    assert_eq!(Value::Seq(vec![]).kind_name(), "seq");
    assert_eq!(Value::Map(Map::new()).kind_name(), "map");
}

#[test]
fn test_from_option() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("a")), Value::Str("a".into()));
}

#[test]
fn test_wire_safety_is_deep() {
    assert!(Value::seq([1.0f64, 2.0]).is_wire_safe());
    let nested = Value::map([("deep", Value::Seq(vec![Value::Float(f64::NAN)]))]);
    assert!(!nested.is_wire_safe());
    assert!(!Value::Float(f64::INFINITY).is_wire_safe());
}
