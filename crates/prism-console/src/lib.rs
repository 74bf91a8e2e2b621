//! prism-console library root.
//!
//! The binary is a thin shell over these modules so that integration tests
//! can exercise config handling, command parsing and rendering directly.

pub mod aws;
pub mod commands;
pub mod config;
pub mod render;
pub mod repl;
pub mod storage;
