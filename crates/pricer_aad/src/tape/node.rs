//! Tape node and identifier types.

use std::fmt;

use pricer_core::numeric::VectorNumeric;

use crate::operator::OperatorKind;

/// Identity of a node on a [`Tape`](super::Tape).
///
/// Ids are issued in creation order, so a node's id is always greater than
/// the ids of its arguments. The id also records the tape generation it was
/// issued in, which lets the tape reject ids that outlived a
/// [`reset`](super::Tape::reset).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    generation: u64,
    index: usize,
}

impl NodeId {
    #[inline]
    pub(crate) fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }

    /// Position of the node on its tape.
    #[inline]
    pub fn index(self) -> usize {
        self.index
    }

    /// Tape generation the node was recorded in.
    #[inline]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Identity of a tape, used to reject operands from different sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TapeId(pub(crate) u64);

impl fmt::Display for TapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// What a node records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Free variable leaf; the gradient is taken with respect to these.
    Variable,
    /// Constant leaf; its adjoint is always zero.
    Constant,
    /// Application of an operator to earlier nodes.
    Operation(OperatorKind),
}

/// One recorded leaf or operation.
///
/// The node keeps its forward value because several partial-derivative
/// rules need argument values, not just argument ids.
#[derive(Clone, Debug)]
pub struct TapeNode {
    id: NodeId,
    kind: NodeKind,
    arguments: [NodeId; 3],
    arity: u8,
    value: VectorNumeric,
}

impl TapeNode {
    pub(crate) fn leaf(id: NodeId, value: VectorNumeric, is_constant: bool) -> Self {
        let kind = if is_constant {
            NodeKind::Constant
        } else {
            NodeKind::Variable
        };
        Self {
            id,
            kind,
            arguments: [NodeId::default(); 3],
            arity: 0,
            value,
        }
    }

    /// `arguments.len()` must equal the operator's arity (at most 3).
    pub(crate) fn operation(
        id: NodeId,
        operator: OperatorKind,
        arguments: &[NodeId],
        value: VectorNumeric,
    ) -> Self {
        let mut slots = [NodeId::default(); 3];
        slots[..arguments.len()].copy_from_slice(arguments);
        Self {
            id,
            kind: NodeKind::Operation(operator),
            arguments: slots,
            arity: arguments.len() as u8,
            value,
        }
    }

    /// Node id.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Leaf marker or operator.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Operator, `None` for leaves.
    #[inline]
    pub fn operator(&self) -> Option<OperatorKind> {
        match self.kind {
            NodeKind::Operation(operator) => Some(operator),
            NodeKind::Variable | NodeKind::Constant => None,
        }
    }

    /// Argument ids in positional order; empty for leaves.
    #[inline]
    pub fn arguments(&self) -> &[NodeId] {
        &self.arguments[..self.arity as usize]
    }

    /// Forward value captured at creation.
    #[inline]
    pub fn value(&self) -> &VectorNumeric {
        &self.value
    }

    /// Whether the node has no arguments.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Operation(_))
    }

    /// Whether the node is a constant leaf.
    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant)
    }

    /// Whether the node is a free variable leaf.
    #[inline]
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable)
    }
}
