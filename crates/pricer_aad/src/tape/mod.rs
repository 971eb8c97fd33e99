//! Append-only recording of the computation graph.
//!
//! A [`Tape`] owns every [`TapeNode`] of one differentiation session. Nodes
//! live in a single contiguous store addressed by [`NodeId`]; only
//! argument edges are stored, never children. Ids are issued in creation
//! order, and an operation can only consume nodes that already exist, so
//! descending id order is a valid reverse-topological order for the sweep.
//!
//! # Sessions and sharing
//!
//! `Tape` is a cheap handle (`Arc` inside). One tape per session is the
//! intended use: independent valuations on independent tapes share nothing
//! and can run in parallel. When several threads do record on the same tape,
//! node insertion is serialised by a writer lock so the id order stays
//! intact; lookups of committed nodes only take the shared read lock.
//!
//! # Examples
//!
//! ```rust
//! use pricer_aad::{OperatorKind, Tape};
//! use pricer_core::numeric::VectorNumeric;
//!
//! let tape = Tape::new();
//! let x = tape.record_leaf(VectorNumeric::scalar(2.0), false);
//! let y = tape.record_operation(OperatorKind::Squared, &[x]);
//!
//! assert!(y > x);
//! assert_eq!(tape.value_of(y).unwrap().as_scalar(), Some(4.0));
//! assert_eq!(tape.arguments_of(y).unwrap(), vec![x]);
//! ```

mod node;

pub use node::{NodeId, NodeKind, TapeId, TapeNode};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pricer_core::numeric::VectorNumeric;
use tracing::{debug, warn};

use crate::config::AadConfig;
use crate::error::{fatal, AadError, AadResult};
use crate::gradient::Gradient;
use crate::operator::OperatorKind;
use crate::reverse::{ReverseAccumulator, SweepOptions};
use crate::value::DifferentiableValue;

static NEXT_TAPE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to the computation graph of one differentiation session.
#[derive(Clone)]
pub struct Tape {
    inner: Arc<TapeInner>,
}

struct TapeInner {
    id: TapeId,
    config: AadConfig,
    state: RwLock<TapeState>,
}

struct TapeState {
    nodes: Vec<TapeNode>,
    generation: u64,
}

impl TapeState {
    fn node(&self, id: NodeId) -> AadResult<&TapeNode> {
        if id.generation() != self.generation {
            return Err(AadError::StaleValue {
                generation: id.generation(),
                current: self.generation,
            });
        }
        self.nodes.get(id.index()).ok_or(AadError::UnknownNode {
            id,
            len: self.nodes.len(),
        })
    }

    fn push<F>(&mut self, config: &AadConfig, build: F) -> AadResult<NodeId>
    where
        F: FnOnce(NodeId) -> TapeNode,
    {
        let index = self.nodes.len();
        if let Some(limit) = config.max_nodes {
            if index >= limit {
                return Err(AadError::CapacityExceeded { limit });
            }
            if index + 1 == limit - limit / 10 {
                warn!(nodes = index + 1, limit, "tape is at 90% of its node limit");
            }
        }
        let id = NodeId::new(self.generation, index);
        self.nodes.push(build(id));
        Ok(id)
    }
}

impl Tape {
    /// Creates an empty tape with the default configuration.
    pub fn new() -> Self {
        Self::with_config(AadConfig::default())
    }

    /// Creates an empty tape.
    pub fn with_config(config: AadConfig) -> Self {
        let id = TapeId(NEXT_TAPE_ID.fetch_add(1, Ordering::Relaxed));
        debug!(tape = %id, ?config, "tape created");
        let nodes = Vec::with_capacity(config.initial_capacity);
        Self {
            inner: Arc::new(TapeInner {
                id,
                config,
                state: RwLock::new(TapeState {
                    nodes,
                    generation: 0,
                }),
            }),
        }
    }

    /// Identity of this tape.
    #[inline]
    pub fn id(&self) -> TapeId {
        self.inner.id
    }

    /// Configuration the tape was created with.
    #[inline]
    pub fn config(&self) -> &AadConfig {
        &self.inner.config
    }

    /// Whether `other` is a handle to the same tape.
    #[inline]
    pub fn same_tape(&self, other: &Tape) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Leaf constructors
    // -------------------------------------------------------------------------

    /// Records a free variable.
    ///
    /// # Panics
    ///
    /// Panics if the tape's node limit is reached.
    pub fn variable(&self, value: impl Into<VectorNumeric>) -> DifferentiableValue {
        self.try_leaf(value.into(), false)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Records a constant. Its gradient is always zero.
    ///
    /// # Panics
    ///
    /// Panics if the tape's node limit is reached.
    pub fn constant(&self, value: impl Into<VectorNumeric>) -> DifferentiableValue {
        self.try_leaf(value.into(), true)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Records a free variable, reporting a full tape as an error.
    pub fn try_variable(&self, value: impl Into<VectorNumeric>) -> AadResult<DifferentiableValue> {
        self.try_leaf(value.into(), false)
    }

    /// Records a constant, reporting a full tape as an error.
    pub fn try_constant(&self, value: impl Into<VectorNumeric>) -> AadResult<DifferentiableValue> {
        self.try_leaf(value.into(), true)
    }

    fn try_leaf(&self, value: VectorNumeric, is_constant: bool) -> AadResult<DifferentiableValue> {
        let id = self.try_record_leaf(value.clone(), is_constant)?;
        Ok(DifferentiableValue::from_parts(
            self.clone(),
            id,
            value,
            is_constant,
        ))
    }

    // -------------------------------------------------------------------------
    // Recording
    // -------------------------------------------------------------------------

    /// Records a leaf node and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::CapacityExceeded`] if the node limit is reached.
    pub fn try_record_leaf(&self, value: VectorNumeric, is_constant: bool) -> AadResult<NodeId> {
        self.write()
            .push(&self.inner.config, |id| TapeNode::leaf(id, value, is_constant))
    }

    /// Records a leaf node and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the node limit is reached.
    pub fn record_leaf(&self, value: VectorNumeric, is_constant: bool) -> NodeId {
        self.try_record_leaf(value, is_constant)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Evaluates `kind` on the values of `arguments` and records the result.
    ///
    /// # Errors
    ///
    /// - [`AadError::ArityMismatch`] if the argument count is wrong
    /// - [`AadError::UnknownNode`] / [`AadError::StaleValue`] if an argument
    ///   is not a live node of this tape
    /// - [`AadError::CapacityExceeded`] if the node limit is reached
    pub fn try_record_operation(&self, kind: OperatorKind, arguments: &[NodeId]) -> AadResult<NodeId> {
        self.push_operation(kind, arguments).map(|(id, _)| id)
    }

    /// Evaluates `kind` on the values of `arguments` and records the result.
    ///
    /// # Panics
    ///
    /// Panics on any usage error reported by
    /// [`try_record_operation`](Self::try_record_operation).
    pub fn record_operation(&self, kind: OperatorKind, arguments: &[NodeId]) -> NodeId {
        self.try_record_operation(kind, arguments)
            .unwrap_or_else(|err| fatal(err))
    }

    /// Records an operation and also returns its forward value.
    ///
    /// The forward rule runs outside the writer lock; argument ids are
    /// checked again under the lock, so a concurrent reset cannot slip a
    /// stale argument in.
    pub(crate) fn push_operation(
        &self,
        kind: OperatorKind,
        arguments: &[NodeId],
    ) -> AadResult<(NodeId, VectorNumeric)> {
        if arguments.len() != kind.arity() {
            return Err(AadError::ArityMismatch {
                operator: kind,
                expected: kind.arity(),
                found: arguments.len(),
            });
        }

        let values = {
            let state = self.read();
            arguments
                .iter()
                .map(|&id| state.node(id).map(|node| node.value().clone()))
                .collect::<AadResult<Vec<_>>>()?
        };
        let refs: Vec<&VectorNumeric> = values.iter().collect();
        let value = kind.forward(&refs)?;

        let mut state = self.write();
        for &id in arguments {
            state.node(id)?;
        }
        let recorded = value.clone();
        let id = state.push(&self.inner.config, |id| {
            TapeNode::operation(id, kind, arguments, recorded)
        })?;
        Ok((id, value))
    }

    // -------------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------------

    /// Number of nodes recorded in the current generation.
    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    /// Whether no node has been recorded since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Current generation, bumped by every [`reset`](Self::reset).
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Copy of the node `id`.
    pub fn node(&self, id: NodeId) -> AadResult<TapeNode> {
        self.read().node(id).cloned()
    }

    /// Forward value of node `id`.
    pub fn value_of(&self, id: NodeId) -> AadResult<VectorNumeric> {
        self.read().node(id).map(|node| node.value().clone())
    }

    /// Argument ids of node `id`, empty for leaves.
    pub fn arguments_of(&self, id: NodeId) -> AadResult<Vec<NodeId>> {
        self.read().node(id).map(|node| node.arguments().to_vec())
    }

    /// Operator of node `id`, `None` for leaves.
    pub fn operator_of(&self, id: NodeId) -> AadResult<Option<OperatorKind>> {
        self.read().node(id).map(TapeNode::operator)
    }

    /// Whether node `id` is a constant leaf.
    pub fn is_constant(&self, id: NodeId) -> AadResult<bool> {
        self.read().node(id).map(TapeNode::is_constant)
    }

    /// Snapshot of every node of the current generation.
    pub fn nodes(&self) -> Vec<TapeNode> {
        self.read().nodes.clone()
    }

    /// Checks that every argument id precedes the node consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::OrderViolation`] for the first offending node.
    pub fn validate_order(&self) -> AadResult<()> {
        let state = self.read();
        for node in &state.nodes {
            if let Some(&argument) = node.arguments().iter().find(|&&arg| arg >= node.id()) {
                return Err(AadError::OrderViolation {
                    node: node.id(),
                    argument,
                });
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Session lifecycle and differentiation
    // -------------------------------------------------------------------------

    /// Discards every node and starts a new generation.
    ///
    /// Values and ids from before the reset are stale afterwards; using them
    /// is reported as [`AadError::StaleValue`].
    pub fn reset(&self) {
        let mut state = self.write();
        let discarded = state.nodes.len();
        state.nodes.clear();
        state.generation += 1;
        debug!(
            tape = %self.inner.id,
            discarded,
            generation = state.generation,
            "tape reset"
        );
    }

    /// Runs the reverse sweep from `root`.
    ///
    /// # Errors
    ///
    /// - [`AadError::UnknownNode`] / [`AadError::StaleValue`] if `root`, a
    ///   target or the lower bound is not a live node of this tape
    /// - [`AadError::NotALeaf`] if a target is an operation node
    pub fn gradient(&self, root: NodeId, options: &SweepOptions) -> AadResult<Gradient> {
        let state = self.read();
        state.node(root)?;
        if let Some(bound) = options.lower_bound {
            state.node(bound)?;
        }
        if let Some(targets) = &options.targets {
            for &target in targets {
                if !state.node(target)?.is_leaf() {
                    return Err(AadError::NotALeaf(target));
                }
            }
        }
        ReverseAccumulator::new(&state.nodes, &self.inner.config).sweep(root, options)
    }

    fn read(&self) -> RwLockReadGuard<'_, TapeState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TapeState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Tape")
            .field("id", &self.inner.id)
            .field("nodes", &state.nodes.len())
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: f64) -> VectorNumeric {
        VectorNumeric::scalar(value)
    }

    #[test]
    fn test_ids_increase_in_creation_order() {
        let tape = Tape::new();
        let a = tape.record_leaf(s(1.0), false);
        let b = tape.record_leaf(s(2.0), true);
        let c = tape.record_operation(OperatorKind::Add, &[a, b]);

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(c.index(), 2);
        assert_eq!(tape.node_count(), 3);
        assert!(tape.validate_order().is_ok());
    }

    #[test]
    fn test_read_accessors() {
        let tape = Tape::new();
        let a = tape.record_leaf(s(3.0), false);
        let b = tape.record_leaf(s(4.0), true);
        let c = tape.record_operation(OperatorKind::Mult, &[a, b]);

        assert_eq!(tape.value_of(c).unwrap().as_scalar(), Some(12.0));
        assert_eq!(tape.arguments_of(c).unwrap(), vec![a, b]);
        assert_eq!(tape.arguments_of(a).unwrap(), Vec::<NodeId>::new());
        assert_eq!(tape.operator_of(c).unwrap(), Some(OperatorKind::Mult));
        assert_eq!(tape.operator_of(a).unwrap(), None);
        assert!(tape.is_constant(b).unwrap());
        assert!(!tape.is_constant(a).unwrap());
        assert!(tape.node(a).unwrap().is_variable());
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let tape = Tape::new();
        let a = tape.record_leaf(s(1.0), false);
        let bogus = NodeId::new(0, 5);
        let err = tape
            .try_record_operation(OperatorKind::Add, &[a, bogus])
            .unwrap_err();
        assert_eq!(err, AadError::UnknownNode { id: bogus, len: 1 });
        assert_eq!(tape.node_count(), 1);
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let tape = Tape::new();
        let a = tape.record_leaf(s(1.0), false);
        let err = tape.try_record_operation(OperatorKind::Exp, &[a, a]).unwrap_err();
        assert!(matches!(err, AadError::ArityMismatch { expected: 1, found: 2, .. }));
    }

    #[test]
    #[should_panic(expected = "not recorded on this tape")]
    fn test_record_operation_panics_on_usage_error() {
        let tape = Tape::new();
        tape.record_operation(OperatorKind::Exp, &[NodeId::new(0, 0)]);
    }

    #[test]
    fn test_capacity_limit() {
        let config = AadConfig::builder()
            .max_nodes(2)
            .initial_capacity(2)
            .build()
            .unwrap();
        let tape = Tape::with_config(config);
        let a = tape.record_leaf(s(1.0), false);
        let _ = tape.record_leaf(s(1.0), false);
        assert_eq!(
            tape.try_record_operation(OperatorKind::Exp, &[a]),
            Err(AadError::CapacityExceeded { limit: 2 })
        );
    }

    #[test]
    fn test_reset_invalidates_old_ids() {
        let tape = Tape::new();
        let a = tape.record_leaf(s(1.0), false);
        tape.reset();

        assert!(tape.is_empty());
        assert_eq!(tape.generation(), 1);
        assert_eq!(
            tape.value_of(a),
            Err(AadError::StaleValue {
                generation: 0,
                current: 1
            })
        );

        let b = tape.record_leaf(s(2.0), false);
        assert_eq!(b.index(), 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_tape() {
        let tape = Tape::new();
        let handle = tape.clone();
        assert!(tape.same_tape(&handle));
        assert!(!tape.same_tape(&Tape::new()));
        assert_ne!(tape.id(), Tape::new().id());
    }

    #[test]
    fn test_gradient_rejects_operation_target() {
        let tape = Tape::new();
        let a = tape.record_leaf(s(1.0), false);
        let b = tape.record_operation(OperatorKind::Exp, &[a]);
        let options = SweepOptions::default().restricted_to(vec![b]);
        assert_eq!(tape.gradient(b, &options), Err(AadError::NotALeaf(b)));
    }

    #[test]
    fn test_concurrent_recording_keeps_order() {
        let tape = Tape::new();
        let x = tape.record_leaf(s(1.0), false);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let tape = tape.clone();
                scope.spawn(move || {
                    let mut last = x;
                    for _ in 0..250 {
                        last = tape.record_operation(OperatorKind::Add, &[last, x]);
                    }
                });
            }
        });

        assert_eq!(tape.node_count(), 1 + 4 * 250);
        assert!(tape.validate_order().is_ok());
    }
}
