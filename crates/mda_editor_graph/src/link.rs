// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::node::NodeId;
use crate::pin::PinRef;
use serde::{Deserialize, Serialize};

/// Unique identifier for a link within one graph
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// A directed edge from an output pin to an input pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Unique link id
    pub id: LinkId,
    /// Source output pin
    pub from: PinRef,
    /// Destination input pin
    pub to: PinRef,
}

impl Link {
    /// Create a new link
    pub fn new(id: LinkId, from: PinRef, to: PinRef) -> Self {
        Self { id, from, to }
    }

    /// Check if this link touches a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from.node == node_id || self.to.node == node_id
    }

    /// Check if this link touches a specific pin
    pub fn involves_pin(&self, pin: &PinRef) -> bool {
        self.from == *pin || self.to == *pin
    }
}
