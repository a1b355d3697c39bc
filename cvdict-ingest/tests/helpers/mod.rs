//! Test Helper Utilities
//!
//! Shared utilities for cvdict-ingest integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod mock_backend;

#[allow(unused_imports)]
pub use db_utils::{add_entry, add_source, create_test_stores, entry_by_word, TestStores};
#[allow(unused_imports)]
pub use mock_backend::ScriptedBackend;
