//! Core Node and State trait definitions

use crate::Result;
use async_trait::async_trait;

/// State threaded through a state machine
///
/// Nodes never mutate the state directly. They return an update and the
/// engine applies it, which keeps every state change in one place.
pub trait State: Send + Sync {
    /// Update produced by one node invocation
    type Update: Send;

    /// Fold an update into the state
    fn apply(&mut self, update: Self::Update);
}

/// A single step of a state machine
#[async_trait]
pub trait Node<S: State>: Send + Sync {
    /// Run the node against a read-only view of the state
    async fn run(&self, state: &S) -> Result<S::Update>;

    /// Get the node's name
    fn name(&self) -> &str;
}
