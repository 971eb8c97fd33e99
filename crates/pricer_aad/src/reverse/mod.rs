//! Reverse adjoint sweep.
//!
//! Starting from a root node seeded with ones (shaped like the root value),
//! nodes are visited in descending id order. Each visited operation node
//! propagates `adjoint · ∂node/∂argument` into every argument that can still
//! carry a gradient:
//!
//! - constant arguments are skipped without evaluating the partial;
//! - arguments below the lower bound are skipped;
//! - when the sweep is restricted to target leaves, arguments from which no
//!   target is reachable are skipped.
//!
//! Because the tape is append-only and arguments always precede their
//! consumer, a node is complete (every consumer has contributed) by the time
//! the descending cursor reaches it.

mod store;

use std::collections::{BTreeMap, BTreeSet};

use pricer_core::numeric::{RandomVariable, VectorNumeric};
use tracing::{debug, trace};

use crate::config::{AadConfig, AdjointReduction};
use crate::error::AadResult;
use crate::gradient::Gradient;
use crate::tape::{NodeId, NodeKind, TapeNode};

use store::AdjointStore;

/// Options narrowing a reverse sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepOptions {
    /// Nodes with a smaller id receive no adjoint.
    pub lower_bound: Option<NodeId>,
    /// Leaves to differentiate with respect to; `None` means every variable.
    pub targets: Option<Vec<NodeId>>,
}

impl SweepOptions {
    /// Unrestricted sweep.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops propagation below `bound`.
    pub fn with_lower_bound(mut self, bound: NodeId) -> Self {
        self.lower_bound = Some(bound);
        self
    }

    /// Only propagates along paths that reach one of `targets`.
    pub fn restricted_to(mut self, targets: Vec<NodeId>) -> Self {
        self.targets = Some(targets);
        self
    }
}

/// One reverse sweep over a borrowed node slice.
pub(crate) struct ReverseAccumulator<'a> {
    nodes: &'a [TapeNode],
    config: &'a AadConfig,
}

impl<'a> ReverseAccumulator<'a> {
    pub(crate) fn new(nodes: &'a [TapeNode], config: &'a AadConfig) -> Self {
        Self { nodes, config }
    }

    /// Runs the sweep. `root`, the lower bound and every target must already
    /// be validated against the tape.
    pub(crate) fn sweep(&self, root: NodeId, options: &SweepOptions) -> AadResult<Gradient> {
        let root_index = root.index();
        let mut lower = options.lower_bound.map_or(0, NodeId::index);

        if let Some(first) = options.targets.iter().flatten().map(|t| t.index()).min() {
            lower = lower.max(first);
        }
        if lower > root_index {
            debug!(root = %root, lower, "nothing to propagate above the lower bound");
            return Ok(Gradient::default());
        }

        let reachable = options
            .targets
            .as_ref()
            .map(|targets| self.reaches_targets(targets, lower, root_index));
        let carries_gradient = |index: usize| -> bool {
            index >= lower
                && !self.nodes[index].is_constant()
                && reachable
                    .as_ref()
                    .map_or(true, |flags| flags[index - lower])
        };

        let mut adjoints = BTreeMap::new();
        let mut stats = SweepStats::default();

        if carries_gradient(root_index) {
            let mut store = AdjointStore::new(lower, root_index, self.config.evict_propagated);
            store.accumulate(root_index, self.nodes[root_index].value().ones_like());

            while let Some((index, adjoint)) = store.pop_highest() {
                let node = &self.nodes[index];
                stats.visited += 1;

                let operator = match node.kind() {
                    NodeKind::Constant => continue,
                    NodeKind::Variable => {
                        adjoints.insert(node.id(), self.reduce_leaf(node, adjoint));
                        continue;
                    }
                    NodeKind::Operation(operator) => operator,
                };
                trace!(node = %node.id(), %operator, "propagating adjoint");

                let arguments = node.arguments();
                let values: Vec<&VectorNumeric> = arguments
                    .iter()
                    .map(|arg| self.nodes[arg.index()].value())
                    .collect();
                for (position, argument) in arguments.iter().enumerate() {
                    if !carries_gradient(argument.index()) {
                        stats.pruned += 1;
                        continue;
                    }
                    let partial = operator.partial(position, &values, node.value())?;
                    store.accumulate(argument.index(), adjoint.mult(&partial));
                }

                if !self.config.retain_leaves_only {
                    adjoints.insert(node.id(), adjoint);
                }
            }
        }

        debug!(
            root = %root,
            lower,
            visited = stats.visited,
            pruned = stats.pruned,
            entries = adjoints.len(),
            "reverse sweep complete"
        );

        let mut gradient = Gradient::from_map(adjoints);
        if let Some(targets) = &options.targets {
            gradient = gradient.filter_to(targets);
        }
        Ok(gradient)
    }

    /// Flags, for every index in `lower..=root`, whether some target is
    /// reachable from that node through argument edges.
    fn reaches_targets(&self, targets: &[NodeId], lower: usize, root: usize) -> Vec<bool> {
        let wanted: BTreeSet<usize> = targets.iter().map(|t| t.index()).collect();
        let mut flags = vec![false; root + 1 - lower];
        for index in lower..=root {
            let node = &self.nodes[index];
            flags[index - lower] = wanted.contains(&index)
                || node
                    .arguments()
                    .iter()
                    .any(|arg| arg.index() >= lower && flags[arg.index() - lower]);
        }
        flags
    }

    fn reduce_leaf(&self, node: &TapeNode, adjoint: VectorNumeric) -> VectorNumeric {
        match self.config.deterministic_adjoints {
            AdjointReduction::Sum if node.value().is_deterministic() => {
                VectorNumeric::scalar(adjoint.sum())
            }
            _ => adjoint,
        }
    }
}

#[derive(Default)]
struct SweepStats {
    visited: usize,
    pruned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorKind;
    use crate::tape::Tape;
    use approx::assert_relative_eq;

    fn s(value: f64) -> VectorNumeric {
        VectorNumeric::scalar(value)
    }

    /// `f = x·y + sin(x)` at x = 0.5, y = 4.
    fn build(tape: &Tape) -> (NodeId, NodeId, NodeId) {
        let x = tape.record_leaf(s(0.5), false);
        let y = tape.record_leaf(s(4.0), false);
        let xy = tape.record_operation(OperatorKind::Mult, &[x, y]);
        let sx = tape.record_operation(OperatorKind::Sin, &[x]);
        let f = tape.record_operation(OperatorKind::Add, &[xy, sx]);
        (x, y, f)
    }

    #[test]
    fn test_sweep_sums_contributions() {
        let tape = Tape::new();
        let (x, y, f) = build(&tape);
        let grad = tape.gradient(f, &SweepOptions::new()).unwrap();

        assert_eq!(grad.len(), 2);
        assert_relative_eq!(grad.get_id(x).unwrap().get(0), 4.0 + 0.5_f64.cos());
        assert_relative_eq!(grad.get_id(y).unwrap().get(0), 0.5);
    }

    #[test]
    fn test_evicting_store_gives_same_gradient() {
        let config = AadConfig::builder().evict_propagated(true).build().unwrap();
        let tape = Tape::with_config(config);
        let (x, y, f) = build(&tape);
        let grad = tape.gradient(f, &SweepOptions::new()).unwrap();
        assert_relative_eq!(grad.get_id(x).unwrap().get(0), 4.0 + 0.5_f64.cos());
        assert_relative_eq!(grad.get_id(y).unwrap().get(0), 0.5);
    }

    #[test]
    fn test_intermediates_retained_on_request() {
        let config = AadConfig::builder().retain_leaves_only(false).build().unwrap();
        let tape = Tape::with_config(config);
        let (_, _, f) = build(&tape);
        let grad = tape.gradient(f, &SweepOptions::new()).unwrap();
        assert_eq!(grad.len(), 5);
        assert_eq!(grad.get_id(f).unwrap().as_scalar(), Some(1.0));
    }

    #[test]
    fn test_targets_restrict_result() {
        let tape = Tape::new();
        let (x, y, f) = build(&tape);
        let grad = tape
            .gradient(f, &SweepOptions::new().restricted_to(vec![y]))
            .unwrap();
        assert_eq!(grad.len(), 1);
        assert!(!grad.contains(x));
        assert_relative_eq!(grad.get_id(y).unwrap().get(0), 0.5);
    }

    #[test]
    fn test_lower_bound_cuts_earlier_nodes() {
        let tape = Tape::new();
        let (x, y, f) = build(&tape);
        let grad = tape
            .gradient(f, &SweepOptions::new().with_lower_bound(y))
            .unwrap();
        assert!(!grad.contains(x));
        assert_relative_eq!(grad.get_id(y).unwrap().get(0), 0.5);
    }

    #[test]
    fn test_target_recorded_after_root_gives_empty_gradient() {
        let tape = Tape::new();
        let x = tape.record_leaf(s(1.0), false);
        let f = tape.record_operation(OperatorKind::Exp, &[x]);
        let bound = tape.record_leaf(s(5.0), false);
        let later = tape.record_leaf(s(2.0), false);

        let grad = tape
            .gradient(f, &SweepOptions::new().restricted_to(vec![later]))
            .unwrap();
        assert!(grad.is_empty());

        let grad = tape
            .gradient(
                f,
                &SweepOptions::new().with_lower_bound(bound).restricted_to(vec![x]),
            )
            .unwrap();
        assert!(grad.is_empty());

        let grad = tape
            .gradient(f, &SweepOptions::new().with_lower_bound(later))
            .unwrap();
        assert!(grad.is_empty());
    }

    #[test]
    fn test_unreachable_target_gives_empty_gradient() {
        let tape = Tape::new();
        let x = tape.record_leaf(s(1.0), false);
        let unused = tape.record_leaf(s(3.0), false);
        let f = tape.record_operation(OperatorKind::Squared, &[x]);

        let grad = tape
            .gradient(f, &SweepOptions::new().restricted_to(vec![unused]))
            .unwrap();
        assert!(grad.is_empty());

        let grad = tape
            .gradient(f, &SweepOptions::new().restricted_to(vec![x, unused]))
            .unwrap();
        assert_eq!(grad.len(), 1);
        assert_relative_eq!(grad.get_id(x).unwrap().get(0), 2.0);
    }

    #[test]
    fn test_constant_root_has_empty_gradient() {
        let tape = Tape::new();
        let c = tape.record_leaf(s(3.0), true);
        let grad = tape.gradient(c, &SweepOptions::new()).unwrap();
        assert!(grad.is_empty());
    }

    #[test]
    fn test_deterministic_leaf_reduction() {
        let build = |tape: &Tape| {
            let x = tape.record_leaf(s(2.0), false);
            let paths = tape.record_leaf(VectorNumeric::from_paths(vec![1.0, 2.0, 3.0]).unwrap(), true);
            let f = tape.record_operation(OperatorKind::Mult, &[x, paths]);
            (x, f)
        };

        let tape = Tape::new();
        let (x, f) = build(&tape);
        let grad = tape.gradient(f, &SweepOptions::new()).unwrap();
        assert_eq!(grad.get_id(x).unwrap().to_vec(), vec![1.0, 2.0, 3.0]);

        let config = AadConfig::builder()
            .deterministic_adjoints(AdjointReduction::Sum)
            .build()
            .unwrap();
        let tape = Tape::with_config(config);
        let (x, f) = build(&tape);
        let grad = tape.gradient(f, &SweepOptions::new()).unwrap();
        assert_eq!(grad.get_id(x).unwrap().as_scalar(), Some(6.0));
    }
}
