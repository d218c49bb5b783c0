//! Tests for [`decode`].

use rstest::{fixture, rstest};

use crate::{DecodeError, Decoded, Dict, Value, decode, encode};

#[fixture]
fn eval_request() -> Value {
    let mut dict = Dict::new();
    dict.insert("op".to_owned(), Value::from("eval"));
    dict.insert("code".to_owned(), Value::from("(+ 1 2)"));
    dict.insert("id".to_owned(), Value::Integer(12));
    dict.insert(
        "nested".to_owned(),
        Value::List(vec![Value::Integer(-3), Value::string_list(["x", ""])]),
    );
    Value::Dict(dict)
}

#[rstest]
fn encoded_values_decode_to_themselves(eval_request: Value) {
    let bytes = encode(&eval_request);
    let decoded = decode(&bytes).expect("decode request");
    assert_eq!(
        decoded,
        Decoded::Complete {
            value: eval_request,
            consumed: bytes.len(),
        }
    );
}

#[rstest]
fn every_strict_prefix_needs_more(eval_request: Value) {
    let bytes = encode(&eval_request);
    for split in 0..bytes.len() {
        let prefix = bytes.get(..split).expect("prefix in range");
        assert_eq!(
            decode(prefix),
            Ok(Decoded::NeedMore),
            "prefix of length {split} should need more input"
        );
    }
}

#[test]
fn trailing_bytes_are_not_consumed() {
    let decoded = decode(b"i1ei2e").expect("decode first value");
    assert_eq!(
        decoded,
        Decoded::Complete {
            value: Value::Integer(1),
            consumed: 3,
        }
    );
}

#[rstest]
#[case::value_missing_after_key(b"d3:fooe".as_slice(), "unsupported token")]
#[case::integer_key(b"di1e1:ae".as_slice(), "dictionary key must be string")]
#[case::list_key(b"dle1:ae".as_slice(), "dictionary key must be string")]
#[case::empty_integer(b"ie".as_slice(), "invalid integer")]
#[case::bare_minus(b"i-e".as_slice(), "invalid integer")]
#[case::letters_in_integer(b"i1x2e".as_slice(), "invalid integer")]
#[case::overflowing_integer(b"i99999999999999999999e".as_slice(), "invalid integer")]
#[case::letters_in_length(b"3x:abc".as_slice(), "invalid string length")]
#[case::unknown_marker(b"x".as_slice(), "unsupported token")]
fn malformed_input_is_an_error(#[case] input: &[u8], #[case] reason: &str) {
    let error = decode(input).expect_err("input must be rejected");
    assert_eq!(error.reason(), reason);
}

#[test]
fn error_reports_offset_of_offending_token() {
    let error = decode(b"d3:fooe").expect_err("input must be rejected");
    assert_eq!(error, DecodeError::UnsupportedToken { token: b'e', offset: 6 });
    assert_eq!(error.to_string(), "unsupported token 'e' at byte 6");
}

#[test]
fn leading_zero_lengths_are_accepted() {
    let decoded = decode(b"03:abc").expect("decode padded length");
    assert_eq!(
        decoded,
        Decoded::Complete {
            value: Value::from("abc"),
            consumed: 6,
        }
    );
}

#[test]
fn duplicate_keys_keep_first_value() {
    let decoded = decode(b"d1:a1:x1:a1:ye").expect("decode duplicate keys");
    let Decoded::Complete { value, .. } = decoded else {
        panic!("expected complete value");
    };
    let dict = value.into_dict().expect("dictionary");
    assert_eq!(dict.get("a"), Some(&Value::from("x")));
}

#[test]
fn deeply_nested_lists_are_rejected() {
    let mut input = vec![b'l'; 2048];
    input.extend(std::iter::repeat_n(b'e', 2048));
    let error = decode(&input).expect_err("nesting must be bounded");
    assert_eq!(error.reason(), "nesting too deep");
}

#[test]
fn empty_input_needs_more() {
    assert_eq!(decode(b""), Ok(Decoded::NeedMore));
}
