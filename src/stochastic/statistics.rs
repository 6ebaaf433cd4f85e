//! Path reductions of a [`RandomVariable`]: moments, extrema and quantiles,
//! each with a probability-weighted overload.
//!
//! Unweighted statistics treat paths as equally likely. Variance is the
//! population variance `E[X^2] - E[X]^2`; the standard error is
//! `stdDev / sqrt(n)`. Weighted overloads take one probability per path and
//! do not renormalize them.
use crate::core::RandomVariableError;
use crate::stochastic::random_variable::{Realizations, common_path_count, nan_max, nan_min};
use crate::stochastic::RandomVariable;

impl RandomVariable {
    /// Path average.
    pub fn average(&self) -> f64 {
        match self.realizations() {
            Realizations::Deterministic(value) => *value,
            Realizations::Stochastic(values) => values.iter().sum::<f64>() / values.len() as f64,
        }
    }

    /// Population variance across paths.
    pub fn variance(&self) -> f64 {
        match self.realizations() {
            Realizations::Deterministic(_) => 0.0,
            Realizations::Stochastic(values) => {
                let mean = self.average();
                values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / values.len() as f64
            }
        }
    }

    #[inline]
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Monte Carlo standard error of [`RandomVariable::average`].
    #[inline]
    pub fn standard_error(&self) -> f64 {
        self.standard_deviation() / (self.size() as f64).sqrt()
    }

    /// Smallest realization; NaN if any path is NaN.
    pub fn min(&self) -> f64 {
        match self.realizations() {
            Realizations::Deterministic(value) => *value,
            Realizations::Stochastic(values) => values.iter().copied().fold(f64::INFINITY, nan_min),
        }
    }

    /// Largest realization; NaN if any path is NaN.
    pub fn max(&self) -> f64 {
        match self.realizations() {
            Realizations::Deterministic(value) => *value,
            Realizations::Stochastic(values) => {
                values.iter().copied().fold(f64::NEG_INFINITY, nan_max)
            }
        }
    }

    /// Empirical quantile: the sorted realization at index
    /// `round((n + 1) * q - 1)`, clamped to the sample.
    pub fn quantile(&self, quantile: f64) -> f64 {
        match self.realizations() {
            Realizations::Deterministic(value) => *value,
            Realizations::Stochastic(values) => {
                if values.is_empty() {
                    return f64::NAN;
                }
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let n = sorted.len();
                let raw = ((n + 1) as f64 * quantile - 1.0).round();
                let index = if raw.is_nan() {
                    0
                } else {
                    (raw.max(0.0) as usize).min(n - 1)
                };
                sorted[index]
            }
        }
    }

    /// Visits `(value, probability)` for every path.
    fn weighted_paths(
        &self,
        probabilities: &RandomVariable,
    ) -> Result<impl Iterator<Item = (f64, f64)> + '_, RandomVariableError> {
        let n = common_path_count(&[self, probabilities])?.unwrap_or(1);
        let probabilities = probabilities.clone();
        Ok((0..n).map(move |i| (self.get(i), probabilities.get(i))))
    }

    /// Probability-weighted average `sum_i x_i p_i`.
    pub fn average_weighted(&self, probabilities: &RandomVariable) -> Result<f64, RandomVariableError> {
        Ok(self.weighted_paths(probabilities)?.map(|(x, p)| x * p).sum())
    }

    /// Probability-weighted variance `sum_i x_i^2 p_i - (sum_i x_i p_i)^2`.
    pub fn variance_weighted(
        &self,
        probabilities: &RandomVariable,
    ) -> Result<f64, RandomVariableError> {
        let mean = self.average_weighted(probabilities)?;
        let second_moment: f64 = self
            .weighted_paths(probabilities)?
            .map(|(x, p)| x * x * p)
            .sum();
        Ok(second_moment - mean * mean)
    }

    pub fn standard_deviation_weighted(
        &self,
        probabilities: &RandomVariable,
    ) -> Result<f64, RandomVariableError> {
        Ok(self.variance_weighted(probabilities)?.sqrt())
    }

    pub fn standard_error_weighted(
        &self,
        probabilities: &RandomVariable,
    ) -> Result<f64, RandomVariableError> {
        let n = common_path_count(&[self, probabilities])?.unwrap_or(1);
        Ok(self.standard_deviation_weighted(probabilities)? / (n as f64).sqrt())
    }

    /// Minimum over paths carrying positive probability.
    pub fn min_weighted(&self, probabilities: &RandomVariable) -> Result<f64, RandomVariableError> {
        Ok(self
            .weighted_paths(probabilities)?
            .filter(|&(_, p)| p > 0.0)
            .map(|(x, _)| x)
            .fold(f64::INFINITY, nan_min))
    }

    /// Maximum over paths carrying positive probability.
    pub fn max_weighted(&self, probabilities: &RandomVariable) -> Result<f64, RandomVariableError> {
        Ok(self
            .weighted_paths(probabilities)?
            .filter(|&(_, p)| p > 0.0)
            .map(|(x, _)| x)
            .fold(f64::NEG_INFINITY, nan_max))
    }

    /// Smallest realization whose cumulative probability reaches
    /// `quantile * total_probability`.
    pub fn quantile_weighted(
        &self,
        quantile: f64,
        probabilities: &RandomVariable,
    ) -> Result<f64, RandomVariableError> {
        let mut pairs: Vec<(f64, f64)> = self.weighted_paths(probabilities)?.collect();
        let total: f64 = pairs.iter().map(|&(_, p)| p).sum();
        if !(total > 0.0) {
            return Err(RandomVariableError::InvalidInput(
                "quantile probabilities must have positive total mass".to_string(),
            ));
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let target = quantile.clamp(0.0, 1.0) * total;
        let mut cumulative = 0.0;
        for &(x, p) in &pairs {
            cumulative += p;
            if cumulative >= target {
                return Ok(x);
            }
        }
        Ok(pairs.last().map_or(f64::NAN, |&(x, _)| x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> RandomVariable {
        RandomVariable::stochastic(1.0, vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
    }

    #[test]
    fn moments_match_population_definitions() {
        let x = sample();
        assert_relative_eq!(x.average(), 5.0, epsilon = 1e-14);
        assert_relative_eq!(x.variance(), 4.0, epsilon = 1e-14);
        assert_relative_eq!(x.standard_deviation(), 2.0, epsilon = 1e-14);
        assert_relative_eq!(x.standard_error(), 2.0 / 8.0_f64.sqrt(), epsilon = 1e-14);
        assert_eq!(x.min(), 2.0);
        assert_eq!(x.max(), 9.0);
    }

    #[test]
    fn extrema_propagate_nan_paths() {
        let x = RandomVariable::stochastic(0.0, vec![1.0, f64::NAN, -3.0]);
        assert!(x.min().is_nan());
        assert!(x.max().is_nan());
        let p = RandomVariable::deterministic(1.0 / 3.0);
        assert!(x.min_weighted(&p).unwrap().is_nan());
        assert!(x.max_weighted(&p).unwrap().is_nan());

        let nan_last = RandomVariable::stochastic(0.0, vec![1.0, -3.0, f64::NAN]);
        assert!(nan_last.min().is_nan());
        assert!(nan_last.max().is_nan());
    }

    #[test]
    fn deterministic_statistics_are_trivial() {
        let c = RandomVariable::deterministic(3.0);
        assert_eq!(c.average(), 3.0);
        assert_eq!(c.variance(), 0.0);
        assert_eq!(c.standard_error(), 0.0);
        assert_eq!(c.quantile(0.9), 3.0);
    }

    #[test]
    fn quantile_uses_rounded_order_statistic() {
        let x = RandomVariable::stochastic(0.0, vec![5.0, 1.0, 3.0, 2.0, 4.0]);
        assert_eq!(x.quantile(0.5), 3.0);
        assert_eq!(x.quantile(0.0), 1.0);
        assert_eq!(x.quantile(1.0), 5.0);
    }

    #[test]
    fn uniform_weights_reproduce_unweighted_statistics() {
        let x = sample();
        let p = RandomVariable::deterministic(1.0 / 8.0);
        assert_relative_eq!(x.average_weighted(&p).unwrap(), x.average(), epsilon = 1e-14);
        assert_relative_eq!(x.variance_weighted(&p).unwrap(), x.variance(), epsilon = 1e-12);
        assert_relative_eq!(
            x.standard_error_weighted(&p).unwrap(),
            x.standard_error(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn weighted_extrema_skip_zero_probability_paths() {
        let x = RandomVariable::stochastic(0.0, vec![-10.0, 1.0, 2.0, 30.0]);
        let p = RandomVariable::stochastic(0.0, vec![0.0, 0.5, 0.5, 0.0]);
        assert_eq!(x.min_weighted(&p).unwrap(), 1.0);
        assert_eq!(x.max_weighted(&p).unwrap(), 2.0);
        assert_eq!(x.quantile_weighted(0.5, &p).unwrap(), 1.0);
        assert_eq!(x.quantile_weighted(0.75, &p).unwrap(), 2.0);
    }

    #[test]
    fn weighted_statistics_reject_mismatched_probabilities() {
        let x = sample();
        let p = RandomVariable::stochastic(0.0, vec![0.5, 0.5]);
        assert!(matches!(
            x.average_weighted(&p),
            Err(RandomVariableError::ShapeMismatch { .. })
        ));
        let zero = RandomVariable::deterministic(0.0);
        assert!(x.quantile_weighted(0.5, &zero).is_err());
    }
}
