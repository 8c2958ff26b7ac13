//! Assertion helpers for sequences and engine results.
//!
//! Each helper names what was being checked so a failing property points at
//! the operator and prints the offending listing.

use std::collections::HashSet;

use seqforge::Sequence;

/// Assert that a result is Ok and return the inner value.
///
/// # Panics
///
/// Panics with `context` and the error if the result is `Err`.
#[allow(dead_code)]
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{} failed: {:?}", context, e),
    }
}

/// Assert that an error message contains expected text, ignoring case.
#[allow(dead_code)]
pub fn assert_error_contains<E: std::fmt::Display>(error: E, expected_text: &str, context: &str) {
    let error_str = error.to_string().to_lowercase();
    assert!(
        error_str.contains(&expected_text.to_lowercase()),
        "{}: error message should contain '{}', got: {}",
        context,
        expected_text,
        error
    );
}

/// Assert that every statement only references variables defined at a
/// smaller position, checked independently of `Sequence::validate`.
#[allow(dead_code)]
pub fn assert_valid_sequence(seq: &Sequence, context: &str) {
    let mut defined = HashSet::new();
    for (pos, stmt) in seq.iter().enumerate() {
        for r in stmt.references() {
            assert!(
                defined.contains(&r),
                "{}: position {} references {} before its definition\n{}",
                context,
                pos,
                r,
                seq
            );
        }
        assert!(defined.insert(stmt.id()), "{}: duplicate id {}\n{}", context, stmt.id(), seq);
    }
}

/// Assert that a value is within an inclusive range.
#[allow(dead_code)]
pub fn assert_in_range<T: PartialOrd + std::fmt::Debug>(value: T, min: T, max: T, context: &str) {
    assert!(
        value >= min && value <= max,
        "{}: expected value in range [{:?}, {:?}], got {:?}",
        context,
        min,
        max,
        value
    );
}
