//! Shared utilities for the credit agents workspace
//!
//! This crate provides common functionality used across the workspace:
//! tracing setup and an environment snapshot that merges the process
//! environment with an optional `.env` file.

pub mod config;
pub mod logging;

pub use config::{ConfigError, EnvSnapshot};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
