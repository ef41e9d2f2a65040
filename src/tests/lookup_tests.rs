//! Tests for intercepting failures around a key lookup

use super::helpers::run_and_wait;
use crate::demos::{lookup_captured, lookup_delegated, read_file};
use crate::types::Val;

#[test]
fn test_intercept_yielded_errors() {
    assert_eq!(run_and_wait(lookup_captured(), vec!["bar".into()]), Ok(Val::Null));
    assert_eq!(
        run_and_wait(lookup_captured(), vec!["foo".into()]),
        Ok(Val::from("bar"))
    );
}

#[test]
fn test_intercept_thrown_errors() {
    assert_eq!(run_and_wait(lookup_delegated(), vec!["bar".into()]), Ok(Val::Null));
    assert_eq!(
        run_and_wait(lookup_delegated(), vec!["foo".into()]),
        Ok(Val::from("bar"))
    );
}

#[test]
fn test_read_file_fails_synchronously_for_missing_keys() {
    let err = read_file("/keys/bar").err().unwrap();
    assert_eq!(err.message(), "could not find /keys/bar");
    assert!(read_file("/keys/foo").is_ok());
}
