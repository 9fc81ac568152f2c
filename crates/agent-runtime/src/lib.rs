//! Agent runtime for invoking models and tools
//!
//! This crate provides the two execution primitives agent nodes are built
//! from: the tiered [`invoke_with_fallback`] model call and the
//! [`ToolExecutor`] that answers pending tool calls.

pub mod fallback;
pub mod tool_executor;

// Re-export key types
pub use fallback::{
    FallbackConfig, FallbackOutcome, ModelTiers, TIER_NAMES, invoke_with_fallback,
    merge_instructions,
};
pub use tool_executor::{NoOpEventHandler, ToolEventHandler, ToolExecutor};
