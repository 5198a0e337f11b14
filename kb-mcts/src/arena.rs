//! Arena-backed node storage.
//!
//! The tree is rebuilt from scratch for every decision, so nodes live in one
//! growable vector addressed by `NodeId`. `clear` keeps the allocation alive
//! across searches.

use crate::node::{Node, NodeId};

#[derive(Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop all nodes but keep the allocation for the next search.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn push(&mut self, n: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(n);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }
}
