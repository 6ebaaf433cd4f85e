//! Module `aad::gradient`.
//!
//! Reverse accumulation over the operator graph. The frontier is an ordered
//! map keyed by node id; the largest id is always processed next, which is a
//! valid reverse-topological order because arguments are numbered before the
//! operations that consume them.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::aad::{DifferentiableRandomVariable, NodeId, OperatorNode};
use crate::core::RandomVariableError;
use crate::stochastic::RandomVariable;

/// Result of a backward pass: one derivative per retained node id.
///
/// Under the default settings only leaf variables keep an entry. An id with
/// no entry had no path to the root and its derivative is zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradient {
    derivatives: HashMap<NodeId, RandomVariable>,
}

impl Gradient {
    /// Derivative with respect to `variable`, if it was reached.
    #[inline]
    pub fn get(&self, variable: &DifferentiableRandomVariable) -> Option<&RandomVariable> {
        self.derivatives.get(&variable.id())
    }

    #[inline]
    pub fn get_by_id(&self, id: NodeId) -> Option<&RandomVariable> {
        self.derivatives.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.derivatives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.derivatives.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.derivatives.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &RandomVariable)> + '_ {
        self.derivatives.iter().map(|(id, value)| (*id, value))
    }

    pub fn into_map(self) -> HashMap<NodeId, RandomVariable> {
        self.derivatives
    }

    pub(crate) fn restricted_to(mut self, ids: &[NodeId]) -> Self {
        self.derivatives.retain(|id, _| ids.contains(id));
        self
    }
}

/// Runs the backward pass from `root`, seeded with a one of the root's shape.
#[instrument(skip_all, name = "backward", fields(root = %root.id()))]
pub(crate) fn backward(
    root: &DifferentiableRandomVariable,
) -> Result<Gradient, RandomVariableError> {
    let settings = root.graph().settings();
    let mut derivatives: HashMap<NodeId, RandomVariable> = HashMap::new();
    derivatives.insert(root.id(), root.values().ones_like());

    let mut frontier: BTreeMap<NodeId, Arc<OperatorNode>> = BTreeMap::new();
    frontier.insert(root.id(), Arc::clone(root.node()));

    let mut visited = 0usize;
    while let Some((id, node)) = frontier.pop_last() {
        visited += 1;
        if node.is_leaf() {
            continue;
        }

        let adjoint = if settings.retain_leaf_nodes_only {
            derivatives.remove(&id)
        } else {
            derivatives.get(&id).cloned()
        };
        let Some(adjoint) = adjoint else {
            continue;
        };

        trace!(node = %id, kind = %node.kind(), "propagating adjoint");
        let incoming = node.transform_adjoint(&adjoint)?;

        for (index, argument) in node.arguments().iter().enumerate() {
            let Some(argument) = argument else {
                continue;
            };
            debug_assert!(argument.id() < id, "argument {} not older than {id}", argument.id());

            let contribution = incoming.mult(&node.partial_derivative(index, settings)?)?;
            match derivatives.entry(argument.id()) {
                Entry::Occupied(mut slot) => {
                    let sum = slot.get().add(&contribution)?;
                    slot.insert(sum);
                }
                Entry::Vacant(slot) => {
                    slot.insert(contribution);
                }
            }
            frontier
                .entry(argument.id())
                .or_insert_with(|| Arc::clone(argument));
        }
    }

    debug!(visited, retained = derivatives.len(), "backward pass complete");
    Ok(Gradient { derivatives })
}

/// Gradients of several independent roots.
///
/// With the `parallel` feature the passes run on the rayon pool; each pass
/// only reads the shared graph.
pub fn batch_gradients(
    roots: &[DifferentiableRandomVariable],
) -> Result<Vec<Gradient>, RandomVariableError> {
    #[cfg(feature = "parallel")]
    {
        roots.par_iter().map(backward).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        roots.iter().map(backward).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aad::Graph;
    use crate::core::GraphSettings;

    #[test]
    fn leaf_root_has_unit_self_gradient() {
        let graph = Graph::new();
        let x = graph.stochastic(0.0, vec![1.0, 2.0, 3.0]);
        let gradient = x.gradient().unwrap();
        assert_eq!(gradient.len(), 1);
        assert_eq!(gradient.get(&x).unwrap().to_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn intermediate_entries_follow_retention_setting() {
        let pruned = Graph::new();
        let x = pruned.constant(2.0);
        let y = x.squared();
        let z = y.mult(3.0).unwrap();
        let gradient = z.gradient().unwrap();
        assert!(gradient.get(&y).is_none());
        assert_eq!(gradient.get(&x).unwrap().deterministic_value(), Some(12.0));

        let full = Graph::with_settings(GraphSettings {
            retain_leaf_nodes_only: false,
            ..GraphSettings::default()
        })
        .unwrap();
        let x = full.constant(2.0);
        let y = x.squared();
        let z = y.mult(3.0).unwrap();
        let gradient = z.gradient().unwrap();
        assert_eq!(gradient.get(&z).unwrap().deterministic_value(), Some(1.0));
        assert_eq!(gradient.get(&y).unwrap().deterministic_value(), Some(3.0));
        assert_eq!(gradient.get(&x).unwrap().deterministic_value(), Some(12.0));
    }

    #[test]
    fn shared_subexpressions_accumulate() {
        let graph = Graph::new();
        let x = graph.constant(3.0);
        let y = x.mult(&x).unwrap().add(&x).unwrap();
        let gradient = y.gradient().unwrap();
        assert_eq!(gradient.get(&x).unwrap().deterministic_value(), Some(7.0));
    }

    #[test]
    fn unreached_leaves_are_absent() {
        let graph = Graph::new();
        let x = graph.constant(1.0);
        let unused = graph.constant(5.0);
        let gradient = x.exp().gradient().unwrap();
        assert!(gradient.get(&unused).is_none());
    }

    #[test]
    fn gradient_wrt_filters_ids() {
        let graph = Graph::new();
        let a = graph.constant(2.0);
        let b = graph.constant(5.0);
        let y = a.mult(&b).unwrap();
        let gradient = y.gradient_wrt(&[b.id()]).unwrap();
        assert_eq!(gradient.len(), 1);
        assert_eq!(gradient.get(&b).unwrap().deterministic_value(), Some(2.0));
    }

    #[test]
    fn batch_matches_individual_passes() {
        let graph = Graph::new();
        let x = graph.stochastic(0.0, vec![0.5, 1.5]);
        let roots = vec![x.exp(), x.squared(), x.sin()];
        let batch = batch_gradients(&roots).unwrap();
        for (root, gradient) in roots.iter().zip(&batch) {
            assert_eq!(&root.gradient().unwrap(), gradient);
        }
    }
}
