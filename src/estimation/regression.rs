//! Module `estimation::regression`.
//!
//! Least-squares projection onto a finite basis of random variables, the
//! estimator used by Longstaff-Schwartz style continuation values.
//!
//! Numerical considerations: the design matrix is solved through its SVD, so
//! rank-deficient bases (for example a deterministic state raised to several
//! powers) still produce the minimum-norm fit instead of failing.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::core::RandomVariableError;
use crate::estimation::ConditionalExpectationEstimator;
use crate::stochastic::RandomVariable;
use crate::stochastic::random_variable::common_path_count;

const SINGULAR_VALUE_TOLERANCE: f64 = 1.0e-12;

/// Regression estimator `E[V | F_t] ~ sum_k beta_k B_k`.
///
/// # Examples
/// ```rust
/// use ferric_rv::estimation::{ConditionalExpectationEstimator, RegressionEstimator};
/// use ferric_rv::stochastic::RandomVariable;
///
/// let state = RandomVariable::stochastic(1.0, vec![1.0, 2.0, 3.0, 4.0]);
/// let estimator = RegressionEstimator::from_polynomial(&state, 1, 1.0).unwrap();
///
/// // A value that is affine in the state is reproduced exactly.
/// let value = RandomVariable::stochastic(2.0, vec![3.0, 5.0, 7.0, 9.0]);
/// let projected = estimator.estimate(&value).unwrap();
/// assert!((projected.get(2) - 7.0).abs() < 1e-10);
/// assert_eq!(projected.filtration_time(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct RegressionEstimator {
    basis: Vec<RandomVariable>,
    evaluation_time: f64,
}

impl RegressionEstimator {
    /// Estimator over explicit basis functions, all measurable at
    /// `evaluation_time`.
    pub fn new(
        basis: Vec<RandomVariable>,
        evaluation_time: f64,
    ) -> Result<Self, RandomVariableError> {
        if basis.is_empty() {
            return Err(RandomVariableError::InvalidInput(
                "regression basis must not be empty".to_string(),
            ));
        }
        let refs: Vec<&RandomVariable> = basis.iter().collect();
        common_path_count(&refs)?;
        Ok(Self {
            basis,
            evaluation_time,
        })
    }

    /// Monomial basis `1, S, S^2, ..., S^degree` of a state variable.
    pub fn from_polynomial(
        state: &RandomVariable,
        degree: usize,
        evaluation_time: f64,
    ) -> Result<Self, RandomVariableError> {
        let mut basis = Vec::with_capacity(degree + 1);
        basis.push(RandomVariable::deterministic(1.0));
        let mut power = state.clone();
        for _ in 0..degree {
            basis.push(power.clone());
            power = power.mult(state)?;
        }
        Self::new(basis, evaluation_time)
    }

    #[inline]
    pub fn basis(&self) -> &[RandomVariable] {
        &self.basis
    }

    #[inline]
    pub fn evaluation_time(&self) -> f64 {
        self.evaluation_time
    }

    fn design_matrix(&self, paths: usize) -> DMatrix<f64> {
        DMatrix::from_fn(paths, self.basis.len(), |path, k| self.basis[k].get(path))
    }

    /// Least-squares coefficients of `value` on the basis.
    pub fn coefficients(&self, value: &RandomVariable) -> Result<DVector<f64>, RandomVariableError> {
        let mut operands: Vec<&RandomVariable> = self.basis.iter().collect();
        operands.push(value);
        let paths = common_path_count(&operands)?.unwrap_or(1);

        let a = self.design_matrix(paths);
        let y = DVector::from_fn(paths, |path, _| value.get(path));
        let beta = a
            .svd(true, true)
            .solve(&y, SINGULAR_VALUE_TOLERANCE)
            .map_err(|err| RandomVariableError::Regression(err.to_string()))?;

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(RandomVariableError::Regression(
                "non-finite regression coefficients".to_string(),
            ));
        }
        trace!(paths, basis = self.basis.len(), "regression solved");
        Ok(beta)
    }
}

impl ConditionalExpectationEstimator for RegressionEstimator {
    fn estimate(&self, value: &RandomVariable) -> Result<RandomVariable, RandomVariableError> {
        // A deterministic value is its own conditional expectation.
        if value.is_deterministic() {
            return Ok(value.clone());
        }
        let beta = self.coefficients(value)?;
        let fitted = self.design_matrix(value.size()) * beta;
        Ok(RandomVariable::stochastic(
            self.evaluation_time,
            fitted.as_slice().to_vec(),
        ))
    }
}
