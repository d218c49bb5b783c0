//! Tests for [`encode`].

use rstest::rstest;

use crate::{Dict, Value, encode};

#[rstest]
#[case::zero(Value::Integer(0), b"i0e".as_slice())]
#[case::negative(Value::Integer(-42), b"i-42e".as_slice())]
#[case::empty_string(Value::from(""), b"0:".as_slice())]
#[case::string(Value::from("spam"), b"4:spam".as_slice())]
#[case::list(Value::string_list(["a", "bc"]), b"l1:a2:bce".as_slice())]
fn encodes_scalars_and_lists(#[case] value: Value, #[case] expected: &[u8]) {
    assert_eq!(encode(&value), expected);
}

#[test]
fn dictionary_keys_are_emitted_in_sorted_order() {
    let mut dict = Dict::new();
    dict.insert("status".to_owned(), Value::string_list(["done"]));
    dict.insert("id".to_owned(), Value::from("7"));
    dict.insert("session".to_owned(), Value::from("s"));

    assert_eq!(
        encode(&Value::Dict(dict)),
        b"d2:id1:77:session1:s6:statusl4:doneee".as_slice()
    );
}

#[test]
fn byte_strings_count_bytes_not_characters() {
    assert_eq!(encode(&Value::from("é")), "2:é".as_bytes());
}
