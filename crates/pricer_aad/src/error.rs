//! Error types for the AD engine.
//!
//! Every variant describes a usage error: a bug in the calling code, not a
//! recoverable condition. The tape exposes them through its fallible
//! `try_*` entry points; the [`DifferentiableValue`](crate::DifferentiableValue)
//! operator surface turns them into an immediate panic so a wrong gradient is
//! never produced silently.
//!
//! Numeric edge cases (division by zero, logarithm of a non-positive value)
//! are not errors. They propagate as NaN or infinity.

use thiserror::Error;

use crate::operator::OperatorKind;
use crate::tape::{NodeId, TapeId};

/// AD engine usage error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AadError {
    /// Operands recorded on different tapes were combined.
    #[error("cannot combine values from tape {found} with values from tape {expected}")]
    ForeignTape {
        /// Tape of the receiving value.
        expected: TapeId,
        /// Tape of the offending operand.
        found: TapeId,
    },

    /// The node id was never recorded on this tape.
    #[error("node {id} is not recorded on this tape ({len} nodes)")]
    UnknownNode {
        /// Requested node.
        id: NodeId,
        /// Number of nodes currently on the tape.
        len: usize,
    },

    /// The node id belongs to a session that has since been reset.
    #[error("node from tape generation {generation} used after reset (current generation {current})")]
    StaleValue {
        /// Generation the node was recorded in.
        generation: u64,
        /// Current generation of the tape.
        current: u64,
    },

    /// An operator was applied to the wrong number of arguments.
    #[error("{operator} takes {expected} argument(s), got {found}")]
    ArityMismatch {
        /// Operator being recorded or evaluated.
        operator: OperatorKind,
        /// Arity of the operator.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// A partial derivative was requested for a position the operator lacks.
    #[error("{operator} has no argument at position {position}")]
    ArgumentPosition {
        /// Operator being differentiated.
        operator: OperatorKind,
        /// Requested argument position.
        position: usize,
    },

    /// A node argument does not precede the node that consumes it.
    #[error("node {node} consumes argument {argument}, which was not recorded before it")]
    OrderViolation {
        /// Consuming node.
        node: NodeId,
        /// Offending argument.
        argument: NodeId,
    },

    /// The tape reached its configured node limit.
    #[error("tape node limit of {limit} reached")]
    CapacityExceeded {
        /// Configured `max_nodes`.
        limit: usize,
    },

    /// The requested node is not a leaf.
    #[error("node {0} is an operation, not a leaf")]
    NotALeaf(NodeId),

    /// The operation cannot be differentiated by the engine.
    #[error("`{0}` is not supported on differentiable values")]
    Unsupported(&'static str),
}

/// Result type for AD engine operations.
pub type AadResult<T> = Result<T, AadError>;

/// Aborts on a usage error.
///
/// Usage errors indicate a bug in the calling code; continuing would record
/// a graph whose gradient is wrong.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: AadError) -> ! {
    panic!("{}", err)
}
