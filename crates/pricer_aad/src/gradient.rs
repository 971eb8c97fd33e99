//! Result of a reverse sweep.

use std::collections::BTreeMap;

use pricer_core::numeric::{RandomVariable, VectorNumeric};

use crate::tape::NodeId;
use crate::value::DifferentiableValue;

/// Adjoints keyed by node, ordered by node id.
///
/// By default only variable leaves appear. Constants never appear, and
/// nodes that the sweep never reached are absent rather than zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gradient {
    adjoints: BTreeMap<NodeId, VectorNumeric>,
}

impl Gradient {
    pub(crate) fn from_map(adjoints: BTreeMap<NodeId, VectorNumeric>) -> Self {
        Self { adjoints }
    }

    /// Adjoint of `value`, if the sweep reached it.
    pub fn get(&self, value: &DifferentiableValue) -> Option<&VectorNumeric> {
        self.get_id(value.node_id())
    }

    /// Adjoint of node `id`, if the sweep reached it.
    pub fn get_id(&self, id: NodeId) -> Option<&VectorNumeric> {
        self.adjoints.get(&id)
    }

    /// Adjoint of `value`, or zero shaped like its value.
    pub fn get_or_zero(&self, value: &DifferentiableValue) -> VectorNumeric {
        self.get(value)
            .cloned()
            .unwrap_or_else(|| value.value().zeros_like())
    }

    /// Mean of the adjoint of `value` over paths; zero if absent.
    ///
    /// For a root that is an expectation estimator built per path, this is
    /// the Monte Carlo estimate of the sensitivity.
    pub fn expectation(&self, value: &DifferentiableValue) -> f64 {
        self.get(value).map_or(0.0, RandomVariable::average_value)
    }

    /// Sum of the adjoint of `value` over paths; zero if absent.
    ///
    /// A deterministic input broadcast into a per-path root receives one
    /// adjoint per path; their sum is its total sensitivity.
    pub fn total(&self, value: &DifferentiableValue) -> f64 {
        self.get(value).map_or(0.0, VectorNumeric::sum)
    }

    /// Whether node `id` has an entry.
    pub fn contains(&self, id: NodeId) -> bool {
        self.adjoints.contains_key(&id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.adjoints.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.adjoints.is_empty()
    }

    /// Node ids with an entry, ascending.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjoints.keys().copied()
    }

    /// Entries, ascending by node id.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &VectorNumeric)> + '_ {
        self.adjoints.iter().map(|(id, adjoint)| (*id, adjoint))
    }

    /// Keeps only the entries for `ids`.
    pub fn filter_to(mut self, ids: &[NodeId]) -> Self {
        self.adjoints.retain(|id, _| ids.contains(id));
        self
    }
}

impl IntoIterator for Gradient {
    type Item = (NodeId, VectorNumeric);
    type IntoIter = std::collections::btree_map::IntoIter<NodeId, VectorNumeric>;

    fn into_iter(self) -> Self::IntoIter {
        self.adjoints.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::Tape;
    use crate::SweepOptions;

    #[test]
    fn test_lookup_and_defaults() {
        let tape = Tape::new();
        let x = tape.variable(VectorNumeric::scalar(3.0));
        let unused = tape.variable(VectorNumeric::from_paths(vec![1.0, 2.0]).unwrap());
        let paths = tape.constant(VectorNumeric::from_paths(vec![1.0, 3.0]).unwrap());
        let f = &x * &paths;

        let grad = f.gradient();
        assert_eq!(grad.len(), 1);
        assert!(grad.contains(x.node_id()));
        assert_eq!(grad.get(&x).unwrap().to_vec(), vec![1.0, 3.0]);
        assert_eq!(grad.expectation(&x), 2.0);
        assert_eq!(grad.total(&x), 4.0);

        assert!(grad.get(&unused).is_none());
        assert_eq!(grad.get_or_zero(&unused).to_vec(), vec![0.0, 0.0]);
        assert_eq!(grad.expectation(&unused), 0.0);
    }

    #[test]
    fn test_iteration_is_ordered_by_id() {
        let tape = Tape::new();
        let a = tape.variable(1.0);
        let b = tape.variable(2.0);
        let c = tape.variable(3.0);
        let f = &(&c * &b) + &a;

        let grad = tape
            .gradient(f.node_id(), &SweepOptions::new())
            .unwrap();
        let ids: Vec<NodeId> = grad.ids().collect();
        assert_eq!(ids, vec![a.node_id(), b.node_id(), c.node_id()]);

        let values: Vec<f64> = grad.into_iter().map(|(_, v)| v.get(0)).collect();
        assert_eq!(values, vec![1.0, 3.0, 2.0]);
    }
}
