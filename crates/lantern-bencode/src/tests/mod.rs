//! Unit and behaviour tests for the Bencode codec.

mod decode_tests;
mod encode_tests;
