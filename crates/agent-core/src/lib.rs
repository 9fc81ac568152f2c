//! Core abstractions for the credit agents workspace
//!
//! This crate defines the fundamental traits and types shared by the other
//! crates: the [`Node`] contract every state-machine step implements, and
//! the common [`Error`] type.

pub mod error;
pub mod node;

pub use error::{Error, Result};
pub use node::{Node, State};
