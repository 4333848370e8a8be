// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lowering of a validated graph into a [`CompiledPlan`].
//!
//! Compilation is only ever invoked on a successfully validated graph, so
//! it has no recoverable error path; an invariant violation here is a
//! defect in the validator or compiler and panics.

use crate::graph::GraphSnapshot;
use crate::node::{Node, NodeId, NodeKind};
use crate::pin::PinRef;
use crate::plan::{BlendLayer, CompiledPlan, Instruction, Op, Operand, PlanOutput, Slot};
use crate::validate::ValidatedGraph;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// Compile a validated graph into an ordered evaluation plan.
///
/// Deterministic: identical input yields identical output. Nodes are
/// ordered by Kahn's algorithm over the reachable set; when several nodes
/// are ready at once, the smallest node id goes first.
pub fn compile(validated: &ValidatedGraph) -> CompiledPlan {
    let snapshot = validated.snapshot();
    let reachable = validated.reachable();

    let mut in_degree = validated.in_degree().clone();
    let mut ready: BinaryHeap<Reverse<NodeId>> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| Reverse(*n))
        .collect();

    let mut instructions = Vec::with_capacity(reachable.len());
    let mut slots: BTreeMap<NodeId, Slot> = BTreeMap::new();

    while let Some(Reverse(node_id)) = ready.pop() {
        let node = snapshot
            .node(node_id)
            .expect("reachable node must exist in the snapshot");

        let slot = Slot(instructions.len() as u32);
        instructions.push(Instruction {
            node: node_id,
            op: lower(snapshot, &slots, node),
        });
        slots.insert(node_id, slot);

        for link in snapshot.links_from(node_id) {
            let Some(remaining) = in_degree.get_mut(&link.to.node) else {
                // Consumer is an orphan; pruned
                continue;
            };
            *remaining = remaining
                .checked_sub(1)
                .expect("in-degree underflow: validator produced bad counts");
            if *remaining == 0 {
                ready.push(Reverse(link.to.node));
            }
        }
    }

    assert_eq!(
        instructions.len(),
        reachable.len(),
        "cycle slipped past validation"
    );

    let outputs = snapshot
        .roots()
        .map(|(name, node)| PlanOutput {
            name: name.to_string(),
            slot: *slots
                .get(&node)
                .expect("root must have been assigned a slot"),
        })
        .collect();

    CompiledPlan::new(instructions, outputs)
}

/// Lower one node into its instruction. Pure: the result depends only on
/// the node's kind and its resolved inputs.
fn lower(snapshot: &GraphSnapshot, slots: &BTreeMap<NodeId, Slot>, node: &Node) -> Op {
    let input = |slot: &str| resolve_input(snapshot, slots, node, slot);

    match &node.kind {
        NodeKind::Parameter { name, ty } => Op::Parameter {
            name: name.clone(),
            ty: *ty,
        },
        NodeKind::Constant { value } => Op::Constant { value: *value },
        NodeKind::Clip { clip } => Op::Clip { clip: clip.clone() },
        NodeKind::Compare { op } => Op::Compare {
            op: *op,
            lhs: input("lhs"),
            rhs: input("rhs"),
        },
        NodeKind::Logic { op } => {
            let mut operands = vec![input("a")];
            if node.pin("b").is_some() {
                operands.push(input("b"));
            }
            Op::Logic {
                op: *op,
                operands,
            }
        }
        NodeKind::Select { options } => Op::Select {
            selector: input("selector"),
            options: (0..*options).map(|i| input(&format!("option_{i}"))).collect(),
        },
        NodeKind::Blend { clamp } => Op::Blend {
            a: input("a"),
            b: input("b"),
            weight: input("weight"),
            clamp: *clamp,
        },
        NodeKind::LayeredBlend { modes, clamp } => Op::LayeredBlend {
            base: input("base"),
            layers: modes
                .iter()
                .enumerate()
                .map(|(i, mode)| BlendLayer {
                    pose: input(&format!("pose_{i}")),
                    weight: input(&format!("weight_{i}")),
                    mode: *mode,
                })
                .collect(),
            clamp: *clamp,
        },
    }
}

/// Resolve an input slot to the producer's plan slot, or to its embedded
/// default literal when nothing is connected.
fn resolve_input(
    snapshot: &GraphSnapshot,
    slots: &BTreeMap<NodeId, Slot>,
    node: &Node,
    slot: &str,
) -> Operand {
    if let Some(link) = snapshot.link_to(&PinRef::new(node.id, slot)) {
        let producer = slots
            .get(&link.from.node)
            .expect("producer must be lowered before its consumer");
        return Operand::Slot(*producer);
    }
    let pin = node.pin(slot).expect("lowered slot must exist on the node");
    let default = pin
        .default
        .expect("unconnected input without default slipped past validation");
    Operand::Literal(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::{BlendMode, NodeKind, WeightClamp};
    use crate::pin::Literal;
    use crate::validate::validate;

    fn clip(graph: &mut Graph, name: &str) -> NodeId {
        graph.add_node(NodeKind::Clip {
            clip: name.to_string(),
        })
    }

    fn blend(graph: &mut Graph) -> NodeId {
        graph.add_node(NodeKind::Blend {
            clamp: WeightClamp::default(),
        })
    }

    fn link(graph: &mut Graph, from: NodeId, from_slot: &str, to: NodeId, to_slot: &str) {
        graph
            .add_link(PinRef::new(from, from_slot), PinRef::new(to, to_slot))
            .unwrap();
    }

    fn compile_graph(graph: &Graph) -> CompiledPlan {
        compile(&validate(&graph.snapshot()).expect("graph must validate"))
    }

    #[test]
    fn test_topological_order_holds_for_every_link() {
        let mut graph = Graph::new("test");
        let walk = clip(&mut graph, "walk");
        let run = clip(&mut graph, "run");
        let aim = clip(&mut graph, "aim");
        let lower_body = blend(&mut graph);
        let full = blend(&mut graph);
        link(&mut graph, walk, "out", lower_body, "a");
        link(&mut graph, run, "out", lower_body, "b");
        link(&mut graph, lower_body, "out", full, "a");
        link(&mut graph, aim, "out", full, "b");
        graph.set_root("pose", full);

        let plan = compile_graph(&graph);
        assert_eq!(plan.len(), 5);
        for l in graph.links() {
            let from = plan.slot_of(l.from.node).unwrap();
            let to = plan.slot_of(l.to.node).unwrap();
            assert!(from < to, "{} must precede {}", l.from.node, l.to.node);
        }
    }

    #[test]
    fn test_orphans_are_pruned_from_the_plan() {
        let mut graph = Graph::new("test");
        let root = clip(&mut graph, "idle");
        let scratch = clip(&mut graph, "wip");
        graph.set_root("pose", root);

        let plan = compile_graph(&graph);
        assert_eq!(plan.len(), 1);
        assert!(plan.slot_of(scratch).is_none());
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let mut graph = Graph::new("test");
        let a = clip(&mut graph, "walk");
        let b = clip(&mut graph, "run");
        let mix = blend(&mut graph);
        link(&mut graph, b, "out", mix, "b");
        link(&mut graph, a, "out", mix, "a");
        graph.set_root("pose", mix);

        let validated = validate(&graph.snapshot()).unwrap();
        assert_eq!(compile(&validated), compile(&validated));
    }

    #[test]
    fn test_ready_nodes_order_by_ascending_id() {
        let mut graph = Graph::new("test");
        // Allocate filler so the interesting sources get ids 3 and 7
        for i in 0..3 {
            clip(&mut graph, &format!("pad{i}"));
        }
        let three = clip(&mut graph, "three");
        for i in 0..3 {
            clip(&mut graph, &format!("pad{i}"));
        }
        let seven = clip(&mut graph, "seven");
        let mix = blend(&mut graph);
        assert_eq!((three, seven), (NodeId(3), NodeId(7)));

        // Insert the links seven-first; the plan must still order 3 first
        link(&mut graph, seven, "out", mix, "b");
        link(&mut graph, three, "out", mix, "a");
        graph.set_root("pose", mix);

        let plan = compile_graph(&graph);
        assert_eq!(plan.instructions()[0].node, three);
        assert_eq!(plan.instructions()[1].node, seven);
        assert_eq!(plan.instructions()[2].node, mix);
    }

    #[test]
    fn test_defaulted_input_becomes_embedded_literal() {
        let mut graph = Graph::new("test");
        let a = clip(&mut graph, "walk");
        let b = clip(&mut graph, "run");
        let mix = blend(&mut graph);
        link(&mut graph, a, "out", mix, "a");
        link(&mut graph, b, "out", mix, "b");
        graph.set_root("pose", mix);

        let plan = compile_graph(&graph);
        let Op::Blend { weight, .. } = &plan.instructions()[2].op else {
            panic!("last instruction must be the blend");
        };
        assert_eq!(*weight, Operand::Literal(Literal::Scalar(0.5)));
    }

    #[test]
    fn test_named_outputs_map_roots_to_slots() {
        let mut graph = Graph::new("test");
        let idle = clip(&mut graph, "idle");
        let aim = clip(&mut graph, "aim");
        graph.set_root("pose", idle);
        graph.set_root("overlay", aim);

        let plan = compile_graph(&graph);
        let outputs: Vec<(&str, Slot)> = plan
            .outputs()
            .iter()
            .map(|o| (o.name.as_str(), o.slot))
            .collect();
        assert_eq!(
            outputs,
            vec![
                ("pose", plan.slot_of(idle).unwrap()),
                ("overlay", plan.slot_of(aim).unwrap()),
            ]
        );
    }

    #[test]
    fn test_layered_blend_lowering() {
        let mut graph = Graph::new("test");
        let base = clip(&mut graph, "idle");
        let aim = clip(&mut graph, "aim_additive");
        let lean = clip(&mut graph, "lean_additive");
        let alpha = graph.add_node(NodeKind::Parameter {
            name: "aim_alpha".to_string(),
            ty: crate::pin::PinType::Scalar,
        });
        let layered = graph.add_node(NodeKind::LayeredBlend {
            modes: vec![BlendMode::Add, BlendMode::CoDAdd],
            clamp: WeightClamp::default(),
        });
        link(&mut graph, base, "out", layered, "base");
        link(&mut graph, aim, "out", layered, "pose_0");
        link(&mut graph, alpha, "out", layered, "weight_0");
        link(&mut graph, lean, "out", layered, "pose_1");
        graph.set_root("pose", layered);

        let plan = compile_graph(&graph);
        let Op::LayeredBlend { base: b, layers, .. } = &plan.instructions().last().unwrap().op
        else {
            panic!("root instruction must be the layered blend");
        };
        assert_eq!(*b, Operand::Slot(plan.slot_of(base).unwrap()));
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].mode, BlendMode::Add);
        assert_eq!(layers[0].weight, Operand::Slot(plan.slot_of(alpha).unwrap()));
        // Unconnected layer weight falls back to its default of 1.0
        assert_eq!(layers[1].weight, Operand::Literal(Literal::Scalar(1.0)));
    }

    #[test]
    fn test_fan_out_producer_compiles_once() {
        let mut graph = Graph::new("test");
        let a = clip(&mut graph, "walk");
        let mix = blend(&mut graph);
        link(&mut graph, a, "out", mix, "a");
        link(&mut graph, a, "out", mix, "b");
        graph.set_root("pose", mix);

        let plan = compile_graph(&graph);
        assert_eq!(plan.len(), 2);
        let Op::Blend { a: op_a, b: op_b, .. } = &plan.instructions()[1].op else {
            panic!("expected blend");
        };
        assert_eq!(op_a, op_b);
    }
}
