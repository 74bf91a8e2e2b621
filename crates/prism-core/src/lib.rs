//! prism-core
//!
//! Pure domain types and storage key conventions.
//! No AWS SDK dependency and no async. This is the shared vocabulary of the
//! Prism conversation pipeline.

pub mod error;
pub mod keys;
pub mod models;
