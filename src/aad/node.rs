//! Module `aad::node`.
//!
//! One entry of the dependency graph: identity, operator kind, argument
//! references and the pruned argument snapshots, plus the partial-derivative
//! catalogue evaluated from those snapshots.
//!
//! Every non-null argument was built strictly earlier and therefore has a
//! smaller id. The backward pass relies on this to walk ids in descending
//! order instead of sorting the graph.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aad::OperatorKind;
use crate::core::{GraphSettings, RandomVariableError};
use crate::estimation::ConditionalExpectationEstimator;
use crate::stochastic::RandomVariable;
use crate::stochastic::random_variable::common_path_count;

/// Graph-wide node identity, strictly increasing in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable node of the operator graph.
pub struct OperatorNode {
    id: NodeId,
    kind: OperatorKind,
    arguments: Vec<Option<Arc<OperatorNode>>>,
    snapshots: Vec<Option<RandomVariable>>,
    estimator: Option<Arc<dyn ConditionalExpectationEstimator>>,
}

#[inline]
fn step(x: f64) -> f64 {
    if x >= 0.0 { 1.0 } else { 0.0 }
}

impl OperatorNode {
    /// Leaf node without arguments.
    pub(crate) fn independent(id: NodeId) -> Self {
        Self {
            id,
            kind: OperatorKind::Independent,
            arguments: Vec::new(),
            snapshots: Vec::new(),
            estimator: None,
        }
    }

    /// Records an operation. `arguments[i]` is `None` when operand `i` is not
    /// differentiable; `snapshots[i]` is its value, kept only if the pruning
    /// table of `kind` says a derivative formula reads it.
    pub(crate) fn new(
        id: NodeId,
        kind: OperatorKind,
        arguments: Vec<Option<Arc<OperatorNode>>>,
        snapshots: Vec<RandomVariable>,
        estimator: Option<Arc<dyn ConditionalExpectationEstimator>>,
    ) -> Self {
        debug_assert_eq!(arguments.len(), kind.arity());
        debug_assert_eq!(snapshots.len(), kind.arity());
        debug_assert!(arguments.iter().flatten().all(|argument| argument.id < id));

        let differentiable: Vec<bool> = arguments.iter().map(Option::is_some).collect();
        let snapshots = snapshots
            .into_iter()
            .zip(kind.retained_snapshots(&differentiable))
            .map(|(snapshot, keep)| keep.then_some(snapshot))
            .collect();

        Self {
            id,
            kind,
            arguments,
            snapshots,
            estimator,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    /// Argument nodes; `None` marks a non-differentiable operand.
    #[inline]
    pub fn arguments(&self) -> &[Option<Arc<OperatorNode>>] {
        &self.arguments
    }

    /// Ids of the differentiable arguments, in argument order.
    pub fn argument_ids(&self) -> Vec<Option<NodeId>> {
        self.arguments
            .iter()
            .map(|argument| argument.as_ref().map(|node| node.id))
            .collect()
    }

    /// True for nodes without arguments.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Retained snapshot of argument `index`, if it survived pruning.
    #[inline]
    pub fn snapshot(&self, index: usize) -> Option<&RandomVariable> {
        self.snapshots.get(index).and_then(Option::as_ref)
    }

    /// Number of argument snapshots kept in memory.
    pub fn retained_snapshot_count(&self) -> usize {
        self.snapshots.iter().flatten().count()
    }

    /// Estimator attached to a conditional-expectation node.
    pub fn estimator(&self) -> Option<&Arc<dyn ConditionalExpectationEstimator>> {
        self.estimator.as_ref()
    }

    fn required(&self, index: usize) -> Result<&RandomVariable, RandomVariableError> {
        self.snapshot(index)
            .ok_or(RandomVariableError::PrunedSnapshot {
                kind: self.kind,
                index,
            })
    }

    /// Partial derivative of this node's value with respect to argument
    /// `index`.
    ///
    /// Reductions follow the expectation convention used by the backward
    /// pass: the returned `G` satisfies `d(result) = E[G * dX]`, so `AVERAGE`
    /// yields `1` and `MIN` yields `n` on the minimizing path.
    pub fn partial_derivative(
        &self,
        index: usize,
        settings: &GraphSettings,
    ) -> Result<RandomVariable, RandomVariableError> {
        use OperatorKind as K;

        let one = || RandomVariable::deterministic(1.0);
        let x = || self.required(0);
        let y = || self.required(1);
        let z = || self.required(2);

        let derivative = match (self.kind, index) {
            (K::Add, _) | (K::Average, _) | (K::ConditionalExpectation, _) => one(),
            (K::Sub, 0) => one(),
            (K::Sub, _) => RandomVariable::deterministic(-1.0),
            (K::Mult, 0) => y()?.clone(),
            (K::Mult, _) => x()?.clone(),
            (K::Div, 0) => y()?.invert(),
            (K::Div, _) => x()?.apply2(y()?, |x, y| -x / (y * y))?,
            (K::Cap, 0) => x()?.apply2(y()?, |x, y| 1.0 - step(x - y))?,
            (K::Cap, _) => x()?.apply2(y()?, |x, y| step(x - y))?,
            (K::Floor, 0) => x()?.apply2(y()?, |x, y| step(x - y))?,
            (K::Floor, _) => x()?.apply2(y()?, |x, y| 1.0 - step(x - y))?,
            (K::Pow, 0) => x()?.apply2(y()?, |x, p| p * x.powf(p - 1.0))?,
            (K::Pow, _) => RandomVariable::deterministic(0.0),
            (K::Squared, _) => x()?.mult_scalar(2.0),
            (K::Sqrt, _) => x()?.apply(|x| 0.5 / x.sqrt()),
            (K::Exp, _) => x()?.exp(),
            (K::Log, _) => x()?.invert(),
            (K::Sin, _) => x()?.cos(),
            (K::Cos, _) => x()?.apply(|x| -x.sin()),
            (K::Abs, _) => x()?.choose_scalar(1.0, -1.0),
            (K::Invert, _) => x()?.apply(|x| -1.0 / (x * x)),
            (K::AddProduct, 0) => one(),
            (K::AddProduct, 1) => z()?.clone(),
            (K::AddProduct, _) => y()?.clone(),
            (K::AddRatio, 0) | (K::SubRatio, 0) => one(),
            (K::AddRatio, 1) => z()?.invert(),
            (K::AddRatio, _) => y()?.apply2(z()?, |y, z| -y / (z * z))?,
            (K::SubRatio, 1) => z()?.apply(|z| -1.0 / z),
            (K::SubRatio, _) => y()?.apply2(z()?, |y, z| y / (z * z))?,
            (K::Accrue, 0) => y()?.apply2(z()?, |y, z| 1.0 + y * z)?,
            (K::Accrue, 1) => x()?.mult(z()?)?,
            (K::Accrue, _) => x()?.mult(y()?)?,
            (K::Discount, 0) => y()?.apply2(z()?, |y, z| 1.0 / (1.0 + y * z))?,
            (K::Discount, 1) => x()?.apply3(y()?, z()?, |x, y, z| {
                let d = 1.0 + y * z;
                -x * z / (d * d)
            })?,
            (K::Discount, _) => x()?.apply3(y()?, z()?, |x, y, z| {
                let d = 1.0 + y * z;
                -x * y / (d * d)
            })?,
            (K::Barrier, 0) => self.barrier_trigger_sensitivity(settings)?,
            (K::Barrier, 1) => x()?.choose_scalar(1.0, 0.0),
            (K::Barrier, _) => x()?.choose_scalar(0.0, 1.0),
            (K::Variance, _) => {
                let x = x()?;
                let mean = x.average();
                x.apply(|x| 2.0 * (x - mean))
            }
            (K::StandardDeviation, _) => {
                let x = x()?;
                let (mean, sd) = (x.average(), x.standard_deviation());
                x.apply(|x| (x - mean) / sd)
            }
            (K::StandardError, _) => {
                let x = x()?;
                let mean = x.average();
                let scale = x.standard_deviation() * (x.size() as f64).sqrt();
                x.apply(|x| (x - mean) / scale)
            }
            (K::Min, _) => {
                let x = x()?;
                let (min, n) = (x.min(), x.size() as f64);
                x.apply(|x| if x == min { n } else { 0.0 })
            }
            (K::Max, _) => {
                let x = x()?;
                let (max, n) = (x.max(), x.size() as f64);
                x.apply(|x| if x == max { n } else { 0.0 })
            }
            (K::AverageWeighted, 0) => {
                let (x, p) = (x()?, y()?);
                p.mult_scalar(Self::path_count(x, p)?)
            }
            (K::AverageWeighted, _) => {
                let (x, p) = (x()?, y()?);
                x.mult_scalar(Self::path_count(x, p)?)
            }
            (K::VarianceWeighted, i) => self.weighted_variance_partial(i, 1.0)?,
            (K::StandardDeviationWeighted, i) => {
                let (x, p) = (x()?, y()?);
                let sd = x.standard_deviation_weighted(p)?;
                self.weighted_variance_partial(i, 0.5 / sd)?
            }
            (K::StandardErrorWeighted, i) => {
                let (x, p) = (x()?, y()?);
                let sd = x.standard_deviation_weighted(p)?;
                let n = Self::path_count(x, p)?;
                self.weighted_variance_partial(i, 0.5 / (sd * n.sqrt()))?
            }
            (K::Independent, _) | (K::Quantile, _) | (K::Apply, _) => {
                return Err(RandomVariableError::UnsupportedOperator { kind: self.kind });
            }
        };
        Ok(derivative)
    }

    fn path_count(x: &RandomVariable, p: &RandomVariable) -> Result<f64, RandomVariableError> {
        Ok(common_path_count(&[x, p])?.unwrap_or(1) as f64)
    }

    /// `scale * n * d Var_P(X)`: `2 P (X - m)` for `X`, `X^2 - 2 m X` for `P`.
    fn weighted_variance_partial(
        &self,
        index: usize,
        scale: f64,
    ) -> Result<RandomVariable, RandomVariableError> {
        let (x, p) = (self.required(0)?, self.required(1)?);
        let mean = x.average_weighted(p)?;
        let factor = scale * Self::path_count(x, p)?;
        if index == 0 {
            x.apply2(p, |x, p| factor * 2.0 * p * (x - mean))
        } else {
            Ok(x.apply(|x| factor * (x * x - 2.0 * mean * x)))
        }
    }

    /// Smoothed derivative of `choose(X, Y, Z)` with respect to the trigger.
    ///
    /// Centered difference of the step function over
    /// `epsilon = width * stdDev(X)`, scaled by the jump `Y - Z`. A degenerate
    /// window (deterministic trigger) has zero sensitivity.
    fn barrier_trigger_sensitivity(
        &self,
        settings: &GraphSettings,
    ) -> Result<RandomVariable, RandomVariableError> {
        let (trigger, up, down) = (self.required(0)?, self.required(1)?, self.required(2)?);
        let epsilon = settings.barrier_smoothing_width * trigger.standard_deviation();
        if !(epsilon.is_finite() && epsilon > 0.0) {
            debug!(node = %self.id, epsilon, "degenerate barrier smoothing window");
            return Ok(RandomVariable::deterministic(0.0));
        }
        let half = 0.5 * epsilon;
        let crossing = trigger.apply(|x| step(x + half) - step(x - half));
        Ok(crossing.mult(&up.sub(down)?)?.div_scalar(epsilon))
    }

    /// Maps the adjoint arriving at this node before it is multiplied by the
    /// partial derivatives: path reductions average it, conditional
    /// expectations project it through their estimator.
    pub(crate) fn transform_adjoint(
        &self,
        adjoint: &RandomVariable,
    ) -> Result<RandomVariable, RandomVariableError> {
        if self.kind.is_path_reduction() {
            return Ok(RandomVariable::deterministic_at(
                adjoint.filtration_time(),
                adjoint.average(),
            ));
        }
        match &self.estimator {
            Some(estimator) if self.kind == OperatorKind::ConditionalExpectation => {
                estimator.estimate(adjoint)
            }
            _ => Ok(adjoint.clone()),
        }
    }
}

impl fmt::Debug for OperatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("arguments", &self.argument_ids())
            .field("retained_snapshots", &self.retained_snapshot_count())
            .field("estimator", &self.estimator.is_some())
            .finish()
    }
}

// Unlink argument chains iteratively so that dropping a very deep graph does
// not recurse once per node.
impl Drop for OperatorNode {
    fn drop(&mut self) {
        let mut pending: Vec<Arc<OperatorNode>> = self.arguments.drain(..).flatten().collect();
        while let Some(node) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(node) {
                pending.extend(node.arguments.drain(..).flatten());
            }
        }
    }
}
