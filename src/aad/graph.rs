//! Graph arena: the id counter and the settings shared by every value recorded
//! on one graph.
//!
//! Ids are drawn from a single atomic counter, so values may be recorded from
//! several threads at once. An argument always exists before the operation
//! that consumes it, so its id is smaller; descending id order is therefore a
//! valid reverse-topological order for the backward pass. This holds only
//! because ids are never reused and nodes are never deleted from a live graph.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::aad::{DifferentiableRandomVariable, NodeId, OperatorNode};
use crate::core::{GraphSettings, RandomVariableError};
use crate::stochastic::RandomVariable;

struct GraphInner {
    next_id: AtomicU64,
    settings: GraphSettings,
}

/// Handle to a differentiation graph. Cloning shares the same arena.
///
/// Independent graphs number their nodes independently; values from two
/// different graphs cannot be combined.
///
/// # Examples
/// ```rust
/// use ferric_rv::aad::Graph;
///
/// let graph = Graph::new();
/// let x = graph.stochastic(0.0, vec![1.0, 2.0]);
/// let y = graph.stochastic(0.0, vec![3.0, 4.0]);
/// assert!(x.id() < y.id());
/// ```
#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::from_valid_settings(GraphSettings::default())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes_created", &self.nodes_created())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl Graph {
    /// Creates a graph with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with explicit settings.
    ///
    /// Fails with [`RandomVariableError::InvalidSettings`] when `settings`
    /// does not pass [`GraphSettings::validate`].
    pub fn with_settings(settings: GraphSettings) -> Result<Self, RandomVariableError> {
        settings.validate()?;
        Ok(Self::from_valid_settings(settings))
    }

    fn from_valid_settings(settings: GraphSettings) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                next_id: AtomicU64::new(0),
                settings,
            }),
        }
    }

    #[inline]
    pub fn settings(&self) -> &GraphSettings {
        &self.inner.settings
    }

    /// Number of ids handed out so far.
    #[inline]
    pub fn nodes_created(&self) -> u64 {
        self.inner.next_id.load(Ordering::Relaxed)
    }

    /// True when both handles point at the same arena.
    #[inline]
    pub fn same_graph(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // The counter is the only synchronization point: every fetch_add returns a
    // distinct value, and a value handed to another thread was numbered before
    // the receiving thread draws its next id.
    #[inline]
    pub(crate) fn next_id(&self) -> NodeId {
        NodeId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers `values` as an independent (leaf) variable.
    pub fn variable(&self, values: RandomVariable) -> DifferentiableRandomVariable {
        let node = OperatorNode::independent(self.next_id());
        DifferentiableRandomVariable::from_parts(self.clone(), Arc::new(node), values)
    }

    /// Deterministic leaf variable.
    #[inline]
    pub fn constant(&self, value: f64) -> DifferentiableRandomVariable {
        self.variable(RandomVariable::deterministic(value))
    }

    /// Stochastic leaf variable from per-path realizations.
    #[inline]
    pub fn stochastic(
        &self,
        filtration_time: f64,
        realizations: impl Into<Arc<[f64]>>,
    ) -> DifferentiableRandomVariable {
        self.variable(RandomVariable::stochastic(filtration_time, realizations))
    }
}
