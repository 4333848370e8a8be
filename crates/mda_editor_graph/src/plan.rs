// SPDX-License-Identifier: MIT OR Apache-2.0
//! The compiled evaluation plan handed to the runtime evaluator.
//!
//! A plan is an ordered instruction list; each instruction's operands are
//! slot indices of earlier instructions or embedded literals, so the
//! runtime can evaluate front to back without re-deriving graph structure.

use crate::node::{BlendMode, CompareOp, LogicOp, NodeId, WeightClamp};
use crate::pin::{Literal, PinType};
use serde::{Deserialize, Serialize};

/// Index of an instruction's result within a plan
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot(pub u32);

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// An instruction operand: a prior result or an embedded literal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Result of an earlier instruction
    Slot(Slot),
    /// Literal baked in at compile time (defaulted constant inputs)
    Literal(Literal),
}

/// One layer of a layered blend instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendLayer {
    /// Layer pose
    pub pose: Operand,
    /// Layer weight
    pub weight: Operand,
    /// Accumulation mode
    pub mode: BlendMode,
}

/// Lowered operation, one per compiled node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Read a named runtime parameter
    Parameter {
        /// Parameter name
        name: String,
        /// Value type
        ty: PinType,
    },
    /// Produce a constant value
    Constant {
        /// The literal
        value: Literal,
    },
    /// Sample a motion clip
    Clip {
        /// Clip asset name
        clip: String,
    },
    /// Scalar comparison
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        lhs: Operand,
        /// Right operand
        rhs: Operand,
    },
    /// Boolean combinator
    Logic {
        /// Operator
        op: LogicOp,
        /// Operands (one for Not, two otherwise)
        operands: Vec<Operand>,
    },
    /// Pick one motion by tag value
    Select {
        /// Tag selector
        selector: Operand,
        /// Selectable motions
        options: Vec<Operand>,
    },
    /// Two-way motion blend
    Blend {
        /// First motion
        a: Operand,
        /// Second motion
        b: Operand,
        /// Blend weight
        weight: Operand,
        /// Weight clamp
        clamp: WeightClamp,
    },
    /// Additive blend of weighted layers onto a base pose
    LayeredBlend {
        /// Base pose
        base: Operand,
        /// Layers in declaration order
        layers: Vec<BlendLayer>,
        /// Clamp applied to every layer weight
        clamp: WeightClamp,
    },
}

/// One plan instruction: a lowered node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Originating graph node, kept for diagnostics
    pub node: NodeId,
    /// The operation
    pub op: Op,
}

/// A named plan output corresponding to a root node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Root name
    pub name: String,
    /// Slot holding the root node's result
    pub slot: Slot,
}

/// Immutable, ordered evaluation plan produced by compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPlan {
    instructions: Vec<Instruction>,
    outputs: Vec<PlanOutput>,
}

impl CompiledPlan {
    pub(crate) fn new(instructions: Vec<Instruction>, outputs: Vec<PlanOutput>) -> Self {
        Self {
            instructions,
            outputs,
        }
    }

    /// Instructions in evaluation order
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Named outputs in root declaration order
    pub fn outputs(&self) -> &[PlanOutput] {
        &self.outputs
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the plan is empty
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The slot assigned to a graph node, if it was compiled
    pub fn slot_of(&self, node: NodeId) -> Option<Slot> {
        self.instructions
            .iter()
            .position(|i| i.node == node)
            .map(|i| Slot(i as u32))
    }
}
