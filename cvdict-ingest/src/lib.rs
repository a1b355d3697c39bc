//! cvdict-ingest library interface
//!
//! Pipeline components that fill the Primary Store from CC-CEDICT, seed
//! vocabulary files, pronunciation side tables and a generative API, plus
//! the read-only reporting and lookup services. The `cvdict` binary is a
//! thin CLI over these modules.

pub mod config;
pub mod db;
pub mod services;
