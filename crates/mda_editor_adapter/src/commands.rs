// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edit commands applied to the graph model.
//!
//! The host editor never mutates the graph directly; it describes edits
//! as [`GraphCommand`] messages, which the session applies in order on
//! the editing thread. Failed commands leave the graph unchanged.

use mda_editor_graph::link::Link;
use mda_editor_graph::node::{BlendMode, WeightClamp};
use mda_editor_graph::{Graph, LinkError, LinkId, NodeId, NodeKind, PinRef};
use serde::{Deserialize, Serialize};

/// One graph edit, expressed as a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphCommand {
    /// Create a node of the given kind
    AddNode {
        /// Node kind and parameters
        kind: NodeKind,
    },
    /// Delete a node and every link touching it
    RemoveNode {
        /// The node
        node: NodeId,
    },
    /// Connect an output pin to an input pin
    AddLink {
        /// Source output pin
        from: PinRef,
        /// Destination input pin
        to: PinRef,
    },
    /// Delete a link
    RemoveLink {
        /// The link
        link: LinkId,
    },
    /// Designate a named root output
    SetRoot {
        /// Root name
        name: String,
        /// The node
        node: NodeId,
    },
    /// Remove a root designation
    ClearRoot {
        /// Root name
        name: String,
    },
    /// Rename a node's display name
    RenameNode {
        /// The node
        node: NodeId,
        /// New display name
        name: String,
    },
    /// Replace a node's kind parameters, rebuilding its pins
    SetKind {
        /// The node
        node: NodeId,
        /// New kind
        kind: NodeKind,
    },
    /// Append a layer to a layered blend node
    AddBlendLayer {
        /// The layered blend node
        node: NodeId,
        /// Accumulation mode of the new layer
        mode: BlendMode,
    },
    /// Remove a layer from a layered blend node.
    ///
    /// Links on layers above the removed index are re-pointed one slot
    /// down so they keep feeding the same layers.
    RemoveBlendLayer {
        /// The layered blend node
        node: NodeId,
        /// Layer index to remove
        index: usize,
    },
}

/// What a successfully applied command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// A node was created
    NodeAdded(NodeId),
    /// A node was deleted
    NodeRemoved(NodeId),
    /// A link was created
    LinkAdded(LinkId),
    /// A link was deleted
    LinkRemoved(LinkId),
    /// A root was designated
    RootSet(String),
    /// A root designation was removed
    RootCleared(String),
    /// A node was renamed
    NodeRenamed(NodeId),
    /// A node's kind changed; listed links no longer fit and were dropped
    NodeReconfigured {
        /// The node
        node: NodeId,
        /// Links dropped by the pin rebuild
        dropped: Vec<Link>,
    },
}

/// Error applying a command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Node does not exist
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Link does not exist
    #[error("link not found: {0}")]
    LinkNotFound(LinkId),

    /// Root name is not designated
    #[error("root not found: '{0}'")]
    RootNotFound(String),

    /// Link creation rejected by the graph model
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Layer edit on a node that is not a layered blend
    #[error("node {0} is not a layered blend")]
    NotLayeredBlend(NodeId),

    /// Layer index out of range
    #[error("node {node} has no layer {index}")]
    LayerOutOfRange {
        /// The node
        node: NodeId,
        /// The bad index
        index: usize,
    },
}

impl GraphCommand {
    /// Apply this command to a graph.
    ///
    /// On error the graph is left unchanged.
    pub fn apply(self, graph: &mut Graph) -> Result<CommandOutcome, CommandError> {
        match self {
            Self::AddNode { kind } => Ok(CommandOutcome::NodeAdded(graph.add_node(kind))),
            Self::RemoveNode { node } => {
                graph
                    .remove_node(node)
                    .ok_or(CommandError::NodeNotFound(node))?;
                Ok(CommandOutcome::NodeRemoved(node))
            }
            Self::AddLink { from, to } => {
                let id = graph.add_link(from, to)?;
                Ok(CommandOutcome::LinkAdded(id))
            }
            Self::RemoveLink { link } => {
                graph
                    .remove_link(link)
                    .ok_or(CommandError::LinkNotFound(link))?;
                Ok(CommandOutcome::LinkRemoved(link))
            }
            Self::SetRoot { name, node } => {
                if !graph.contains_node(node) {
                    return Err(CommandError::NodeNotFound(node));
                }
                graph.set_root(name.clone(), node);
                Ok(CommandOutcome::RootSet(name))
            }
            Self::ClearRoot { name } => {
                graph
                    .clear_root(&name)
                    .ok_or_else(|| CommandError::RootNotFound(name.clone()))?;
                Ok(CommandOutcome::RootCleared(name))
            }
            Self::RenameNode { node, name } => {
                let n = graph
                    .node_mut(node)
                    .ok_or(CommandError::NodeNotFound(node))?;
                n.name = name;
                Ok(CommandOutcome::NodeRenamed(node))
            }
            Self::SetKind { node, kind } => {
                let dropped = graph
                    .reconfigure_node(node, kind)
                    .ok_or(CommandError::NodeNotFound(node))?;
                Ok(CommandOutcome::NodeReconfigured { node, dropped })
            }
            Self::AddBlendLayer { node, mode } => add_blend_layer(graph, node, mode),
            Self::RemoveBlendLayer { node, index } => remove_blend_layer(graph, node, index),
        }
    }
}

fn layered_params(
    graph: &Graph,
    node: NodeId,
) -> Result<(Vec<BlendMode>, WeightClamp), CommandError> {
    let n = graph.node(node).ok_or(CommandError::NodeNotFound(node))?;
    match &n.kind {
        NodeKind::LayeredBlend { modes, clamp } => Ok((modes.clone(), *clamp)),
        _ => Err(CommandError::NotLayeredBlend(node)),
    }
}

fn add_blend_layer(
    graph: &mut Graph,
    node: NodeId,
    mode: BlendMode,
) -> Result<CommandOutcome, CommandError> {
    let (mut modes, clamp) = layered_params(graph, node)?;
    modes.push(mode);
    // Growing the layer list only adds slots; nothing is dropped
    let dropped = graph
        .reconfigure_node(node, NodeKind::LayeredBlend { modes, clamp })
        .ok_or(CommandError::NodeNotFound(node))?;
    Ok(CommandOutcome::NodeReconfigured { node, dropped })
}

fn remove_blend_layer(
    graph: &mut Graph,
    node: NodeId,
    index: usize,
) -> Result<CommandOutcome, CommandError> {
    let (mut modes, clamp) = layered_params(graph, node)?;
    if index >= modes.len() {
        return Err(CommandError::LayerOutOfRange { node, index });
    }
    modes.remove(index);
    let kind = NodeKind::LayeredBlend { modes, clamp };

    // Collect the layer links before the rebuild: the removed layer's
    // links go away, links above it shift one slot down
    let mut removed = Vec::new();
    let mut shifted = Vec::new();
    for link in graph.links_into(node) {
        let Some((prefix, layer)) = layer_slot(&link.to.slot) else {
            continue;
        };
        if layer == index {
            removed.push(link.id);
        } else if layer > index {
            shifted.push((link.id, link.from.clone(), format!("{prefix}_{}", layer - 1)));
        }
    }
    for id in removed.iter().chain(shifted.iter().map(|(id, _, _)| id)) {
        graph.remove_link(*id);
    }

    let dropped = graph
        .reconfigure_node(node, kind)
        .ok_or(CommandError::NodeNotFound(node))?;
    for (_, from, slot) in shifted {
        graph.add_link(from, PinRef::new(node, slot))?;
    }
    Ok(CommandOutcome::NodeReconfigured { node, dropped })
}

/// Split a per-layer slot name like `pose_2` or `weight_0`
fn layer_slot(slot: &str) -> Option<(&str, usize)> {
    let (prefix, index) = slot.rsplit_once('_')?;
    if prefix != "pose" && prefix != "weight" {
        return None;
    }
    Some((prefix, index.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layered(graph: &mut Graph, layers: usize) -> NodeId {
        graph.add_node(NodeKind::LayeredBlend {
            modes: vec![BlendMode::Add; layers],
            clamp: WeightClamp::default(),
        })
    }

    fn clip(graph: &mut Graph, name: &str) -> NodeId {
        graph.add_node(NodeKind::Clip {
            clip: name.to_string(),
        })
    }

    #[test]
    fn test_add_blend_layer_grows_pins() {
        let mut graph = Graph::new("test");
        let node = layered(&mut graph, 1);

        let outcome = GraphCommand::AddBlendLayer {
            node,
            mode: BlendMode::Subtract,
        }
        .apply(&mut graph)
        .unwrap();

        assert!(matches!(
            outcome,
            CommandOutcome::NodeReconfigured { dropped, .. } if dropped.is_empty()
        ));
        let n = graph.node(node).unwrap();
        assert!(n.pin("pose_1").is_some());
        assert!(n.pin("weight_1").is_some());
        assert_eq!(
            n.kind,
            NodeKind::LayeredBlend {
                modes: vec![BlendMode::Add, BlendMode::Subtract],
                clamp: WeightClamp::default(),
            }
        );
    }

    #[test]
    fn test_remove_blend_layer_shifts_links_down() {
        let mut graph = Graph::new("test");
        let node = layered(&mut graph, 3);
        let a = clip(&mut graph, "a");
        let b = clip(&mut graph, "b");
        let c = clip(&mut graph, "c");
        for (i, src) in [a, b, c].into_iter().enumerate() {
            graph
                .add_link(PinRef::new(src, "out"), PinRef::new(node, format!("pose_{i}")))
                .unwrap();
        }

        GraphCommand::RemoveBlendLayer { node, index: 1 }
            .apply(&mut graph)
            .unwrap();

        // Layer 1 (fed by b) is gone; c moved down into its place
        let n = graph.node(node).unwrap();
        assert!(n.pin("pose_2").is_none());
        assert_eq!(
            graph.link_to(&PinRef::new(node, "pose_0")).unwrap().from,
            PinRef::new(a, "out")
        );
        assert_eq!(
            graph.link_to(&PinRef::new(node, "pose_1")).unwrap().from,
            PinRef::new(c, "out")
        );
        assert!(graph.links_from(b).next().is_none());
    }

    #[test]
    fn test_remove_blend_layer_out_of_range() {
        let mut graph = Graph::new("test");
        let node = layered(&mut graph, 1);

        let err = GraphCommand::RemoveBlendLayer { node, index: 1 }
            .apply(&mut graph)
            .unwrap_err();
        assert_eq!(err, CommandError::LayerOutOfRange { node, index: 1 });
    }

    #[test]
    fn test_layer_edit_rejects_other_kinds() {
        let mut graph = Graph::new("test");
        let node = clip(&mut graph, "walk");

        let err = GraphCommand::AddBlendLayer {
            node,
            mode: BlendMode::Add,
        }
        .apply(&mut graph)
        .unwrap_err();
        assert_eq!(err, CommandError::NotLayeredBlend(node));
    }

    #[test]
    fn test_failed_command_leaves_graph_unchanged() {
        let mut graph = Graph::new("test");
        let a = clip(&mut graph, "walk");
        let before = graph.revision();

        let err = GraphCommand::AddLink {
            from: PinRef::new(a, "out"),
            to: PinRef::new(NodeId(99), "a"),
        }
        .apply(&mut graph)
        .unwrap_err();
        assert!(matches!(err, CommandError::Link(LinkError::UnknownPin { .. })));
        assert_eq!(graph.revision(), before);
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_set_root_requires_existing_node() {
        let mut graph = Graph::new("test");
        let err = GraphCommand::SetRoot {
            name: "pose".to_string(),
            node: NodeId(0),
        }
        .apply(&mut graph)
        .unwrap_err();
        assert_eq!(err, CommandError::NodeNotFound(NodeId(0)));
    }
}
