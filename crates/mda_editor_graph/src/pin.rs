// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

/// Data type that can flow through pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinType {
    /// Boolean value
    Bool,
    /// Floating point value
    Scalar,
    /// Motion clip reference
    Motion,
    /// Enumerated tag value
    Tag,
}

impl PinType {
    /// Check whether an input of this type accepts a source of `src`.
    ///
    /// Identical types always connect. The only implicit widening is
    /// `Bool` into `Scalar` (true becomes 1.0, false becomes 0.0).
    pub fn accepts(self, src: PinType) -> bool {
        self == src || (self == Self::Scalar && src == Self::Bool)
    }
}

/// A literal value carried by a pin default or a constant node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Boolean
    Bool(bool),
    /// Scalar
    Scalar(f32),
    /// Enumerated tag
    Tag(u32),
}

impl Literal {
    /// Get the pin type for this literal
    pub fn pin_type(self) -> PinType {
        match self {
            Self::Bool(_) => PinType::Bool,
            Self::Scalar(_) => PinType::Scalar,
            Self::Tag(_) => PinType::Tag,
        }
    }
}

/// A typed connection point on a node.
///
/// Pins are owned by their node and addressed by slot name; see [`PinRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Pin direction
    pub direction: PinDirection,
    /// Data type
    pub pin_type: PinType,
    /// Whether this pin must be fed (for inputs)
    pub required: bool,
    /// Default value used when an input has no incoming link
    pub default: Option<Literal>,
    /// Whether multiple links may attach to this slot
    pub multi: bool,
}

impl Pin {
    /// Create a new input pin
    pub fn input(pin_type: PinType) -> Self {
        Self {
            direction: PinDirection::Input,
            pin_type,
            required: false,
            default: None,
            multi: false,
        }
    }

    /// Create a new output pin
    pub fn output(pin_type: PinType) -> Self {
        Self {
            direction: PinDirection::Output,
            pin_type,
            required: false,
            default: None,
            // Outputs fan out to any number of consumers
            multi: true,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: Literal) -> Self {
        self.default = Some(value);
        self
    }
}

/// Address of a pin: owning node plus slot name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    /// Owning node
    pub node: NodeId,
    /// Slot name on the node
    pub slot: String,
}

impl PinRef {
    /// Create a pin reference
    pub fn new(node: NodeId, slot: impl Into<String>) -> Self {
        Self {
            node,
            slot: slot.into(),
        }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.slot)
    }
}
