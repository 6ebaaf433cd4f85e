//! ferric-rv is a vectorized Monte Carlo random-variable library with
//! reverse-mode algorithmic differentiation.
//!
//! A random variable is either a deterministic scalar or one realization per
//! simulation path, tagged with the filtration time at which it becomes
//! known. Arithmetic is elementwise; reductions such as averages collapse the
//! path dimension. The differentiable variant records every operation on a
//! [`Graph`](aad::Graph) so that the sensitivities of a Monte Carlo estimate
//! to all of its inputs come out of a single backward pass.
//!
//! References used across modules include:
//! - Fries, *Stochastic Algorithmic Differentiation of (Expectations of)
//!   Discontinuous Functions (Indicator Functions)* (2018), for the smoothed
//!   barrier derivative.
//! - Giles and Glasserman (2006), *Smoking Adjoints*, for pathwise adjoints.
//! - Longstaff and Schwartz (2001) for regression-based conditional expectations.
//!
//! Numerical considerations:
//! - Kernels follow IEEE-754: division by zero, the log of a non-positive path
//!   or the derivative of `sqrt` at zero produce `inf`/`NaN` rather than errors.
//! - The derivative of `choose` with respect to its trigger is a finite
//!   difference over a window proportional to the trigger's standard
//!   deviation; see [`GraphSettings`](core::GraphSettings).
//!
//! # Feature Flags
//! - `parallel`: enables Rayon-powered elementwise kernels on large path sets
//!   and parallel [`batch_gradients`](aad::batch_gradients).
//!
//! # Quick Start
//! Differentiate a Monte Carlo expectation:
//! ```rust
//! use ferric_rv::aad::Graph;
//!
//! let graph = Graph::new();
//! let spot = graph.constant(100.0);
//! let shocks = graph.stochastic(1.0, vec![0.9, 1.0, 1.1, 1.2]);
//!
//! // E[max(S * Z - 105, 0)]
//! let payoff = spot.mult(&shocks).unwrap().sub(105.0).unwrap().floor(0.0).unwrap();
//! let price = payoff.average();
//! assert!((price.values().get(0) - 5.0).abs() < 1e-12);
//!
//! let gradient = price.gradient().unwrap();
//! let delta = gradient.get(&spot).unwrap().average();
//! assert!((delta - 0.575).abs() < 1e-12);
//! ```
//!
//! Plain vectorized arithmetic:
//! ```rust
//! use ferric_rv::stochastic::RandomVariable;
//!
//! let x = RandomVariable::stochastic(0.0, vec![1.0, 2.0, 3.0]);
//! let y = x.squared().add_scalar(1.0);
//! assert_eq!(y.average(), 17.0 / 3.0);
//! ```
//!
//! Project onto a regression basis inside the graph:
//! ```rust
//! use std::sync::Arc;
//! use ferric_rv::aad::Graph;
//! use ferric_rv::estimation::RegressionEstimator;
//! use ferric_rv::stochastic::RandomVariable;
//!
//! let state = RandomVariable::stochastic(1.0, vec![1.0, 2.0, 3.0, 4.0]);
//! let estimator = Arc::new(RegressionEstimator::from_polynomial(&state, 1, 1.0).unwrap());
//!
//! let graph = Graph::new();
//! let x = graph.stochastic(2.0, vec![2.0, 4.0, 6.0, 8.0]);
//! let projected = x.conditional_expectation(estimator).unwrap();
//! assert_eq!(projected.filtration_time(), 1.0);
//! ```

pub mod aad;
pub mod core;
pub mod estimation;
pub mod stochastic;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::aad::{
        AnyRandomVariable, DifferentiableRandomVariable, Gradient, Graph, NodeId, Operand,
        OperatorKind, batch_gradients,
    };
    pub use crate::core::*;
    pub use crate::estimation::{ConditionalExpectationEstimator, RegressionEstimator};
    pub use crate::stochastic::{RandomVariable, Realizations};
}
