//! Tool management and execution framework
//!
//! This crate provides a framework for defining tools (functions) that
//! agents can call, describing and parsing their arguments through typed
//! structs, and dispatching them so that every outcome, failures included,
//! is text the model can read.

pub mod args;
pub mod error;
pub mod registry;
pub mod tool;

pub use args::{parse_arguments, schema_of};
pub use error::{Result, ToolError};
pub use registry::ToolRegistry;
pub use tool::Tool;
