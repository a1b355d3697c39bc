//! # cvdict Common Library
//!
//! Shared code for the Chinese–Vietnamese dictionary tooling:
//! - Primary Store and Source Store initialization
//! - Additive schema synchronization
//! - Row models and the typed, non-destructive entry patch
//! - Configuration and root folder resolution
//! - Pinyin tone-number rendering

pub mod config;
pub mod db;
pub mod error;
pub mod pinyin;

pub use error::{Error, Result};
