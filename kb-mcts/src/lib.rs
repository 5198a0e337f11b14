//! kb-mcts: PUCT MCTS with batched leaf evaluation.
//!
//! The search walks a per-decision tree over the fixed action space `A=3`
//! (kb-core), resolves chance by sampling in place, and evaluates leaves in
//! waves through any `Oracle`, raw evaluator and batching dispatcher alike.

pub mod arena;
pub mod mcts;
pub mod node;

pub use mcts::{Mcts, MctsConfig, MctsError, SearchError, SearchResult, SearchStats};
pub use node::{Node, NodeId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}
