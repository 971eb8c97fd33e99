//! Adjoint storage used during a sweep.

use std::collections::BTreeMap;

use pricer_core::numeric::{RandomVariable, VectorNumeric};

/// Pending adjoints, handed out in descending node order.
///
/// `Dense` keeps one slot per node between the lower bound and the root.
/// `Frontier` only holds adjoints that have been contributed to but not yet
/// propagated, so its size is bounded by the width of the graph rather than
/// by its length.
pub(super) enum AdjointStore {
    Dense {
        offset: usize,
        cursor: usize,
        slots: Vec<Option<VectorNumeric>>,
    },
    Frontier(BTreeMap<usize, VectorNumeric>),
}

impl AdjointStore {
    /// Store covering node indices `lower..=root`.
    pub(super) fn new(lower: usize, root: usize, evict_propagated: bool) -> Self {
        if evict_propagated {
            AdjointStore::Frontier(BTreeMap::new())
        } else {
            let len = root + 1 - lower;
            AdjointStore::Dense {
                offset: lower,
                cursor: len,
                slots: vec![None; len],
            }
        }
    }

    /// Adds `contribution` to the adjoint of node `index`.
    pub(super) fn accumulate(&mut self, index: usize, contribution: VectorNumeric) {
        let slot = match self {
            AdjointStore::Dense { offset, slots, .. } => &mut slots[index - *offset],
            AdjointStore::Frontier(map) => {
                match map.remove(&index) {
                    Some(existing) => map.insert(index, existing.add(&contribution)),
                    None => map.insert(index, contribution),
                };
                return;
            }
        };
        *slot = Some(match slot.take() {
            Some(existing) => existing.add(&contribution),
            None => contribution,
        });
    }

    /// Removes and returns the pending adjoint with the highest node index.
    pub(super) fn pop_highest(&mut self) -> Option<(usize, VectorNumeric)> {
        match self {
            AdjointStore::Dense {
                offset,
                cursor,
                slots,
            } => {
                while *cursor > 0 {
                    *cursor -= 1;
                    if let Some(adjoint) = slots[*cursor].take() {
                        return Some((*cursor + *offset, adjoint));
                    }
                }
                None
            }
            AdjointStore::Frontier(map) => map.pop_last(),
        }
    }

    #[cfg(test)]
    pub(super) fn pending(&self) -> usize {
        match self {
            AdjointStore::Dense { slots, .. } => slots.iter().filter(|s| s.is_some()).count(),
            AdjointStore::Frontier(map) => map.len(),
        }
    }
}
