//! Vectorized Monte Carlo values without differentiation.
//!
//! [`RandomVariable`] is the numeric backend of the AD layer: every
//! differentiable operation evaluates its result through these kernels.

pub mod random_variable;
pub mod statistics;

pub use random_variable::{PARALLEL_MIN_PATHS, RandomVariable, Realizations};
