//! Deterministic, pure logic shared by the provisioner stages.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data (strings already read from disk, environment lookups passed in as
//! closures) and return deterministic outputs suitable for tests.

pub mod home;
pub mod plan;
pub mod platform;
pub mod types;
