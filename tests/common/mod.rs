#![allow(unused_imports)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: catalogs, the `Foo.setX` sequence and temporary config files
//! - `assertions`: assertion helpers with sequence listings in failures

pub mod assertions;
pub mod fixtures;

pub use assertions::{assert_error_contains, assert_in_range, assert_ok, assert_valid_sequence};
pub use fixtures::{foo_catalog, foo_set_x_sequence, rich_catalog, temp_config_file};
