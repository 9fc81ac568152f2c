//! State-machine orchestration
//!
//! This crate provides [`StateGraph`], a small engine that walks a set of
//! [`Node`](agent_core::Node)s connected by fixed and conditional edges,
//! applying each node's update to a shared state until the finish key is
//! reached or the step limit runs out.

pub mod error;
pub mod graph;

// Re-export for convenience
pub use error::{Result, WorkflowError};
pub use graph::{GraphRun, NoOpObserver, StateGraph, StateGraphBuilder, StepObserver};
