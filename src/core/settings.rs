//! Graph-wide settings read by the operator nodes and the backward pass.

use serde::{Deserialize, Serialize};

use crate::core::RandomVariableError;

/// Default smoothing-window factor for barrier trigger sensitivities.
pub const DEFAULT_BARRIER_SMOOTHING_WIDTH: f64 = 0.2;

/// Settings held by a [`Graph`](crate::aad::Graph) and shared by every value
/// recorded on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Window factor for the barrier trigger derivative:
    /// `epsilon = barrier_smoothing_width * stdDev(trigger)`.
    ///
    /// `0.2` is an empirical choice kept for compatibility; smaller values
    /// approach the exact (singular) derivative at the cost of variance.
    #[serde(default = "default_barrier_smoothing_width")]
    pub barrier_smoothing_width: f64,
    /// Drop adjoints of interior nodes once they have been propagated.
    #[serde(default = "default_retain_leaf_nodes_only")]
    pub retain_leaf_nodes_only: bool,
}

fn default_barrier_smoothing_width() -> f64 {
    DEFAULT_BARRIER_SMOOTHING_WIDTH
}

fn default_retain_leaf_nodes_only() -> bool {
    true
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            barrier_smoothing_width: default_barrier_smoothing_width(),
            retain_leaf_nodes_only: default_retain_leaf_nodes_only(),
        }
    }
}

impl GraphSettings {
    /// Creates a settings builder starting from the defaults.
    pub fn builder() -> GraphSettingsBuilder {
        GraphSettingsBuilder::default()
    }

    /// Parses settings from JSON; absent fields take their defaults.
    ///
    /// # Examples
    /// ```rust
    /// use ferric_rv::core::GraphSettings;
    ///
    /// let settings = GraphSettings::from_json(r#"{ "barrier_smoothing_width": 0.05 }"#).unwrap();
    /// assert_eq!(settings.barrier_smoothing_width, 0.05);
    /// assert!(settings.retain_leaf_nodes_only);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, RandomVariableError> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|err| RandomVariableError::InvalidSettings(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks field ranges.
    pub fn validate(&self) -> Result<(), RandomVariableError> {
        if !self.barrier_smoothing_width.is_finite() || self.barrier_smoothing_width <= 0.0 {
            return Err(RandomVariableError::InvalidSettings(format!(
                "barrier_smoothing_width must be finite and > 0, got {}",
                self.barrier_smoothing_width
            )));
        }
        Ok(())
    }
}

/// Builder for [`GraphSettings`].
#[derive(Debug, Clone, Default)]
pub struct GraphSettingsBuilder {
    barrier_smoothing_width: Option<f64>,
    retain_leaf_nodes_only: Option<bool>,
}

impl GraphSettingsBuilder {
    /// Sets the barrier smoothing-window factor.
    #[inline]
    pub fn barrier_smoothing_width(mut self, width: f64) -> Self {
        self.barrier_smoothing_width = Some(width);
        self
    }

    /// Keeps or drops interior-node adjoints in returned gradients.
    #[inline]
    pub fn retain_leaf_nodes_only(mut self, retain: bool) -> Self {
        self.retain_leaf_nodes_only = Some(retain);
        self
    }

    /// Validates and builds the settings.
    pub fn build(self) -> Result<GraphSettings, RandomVariableError> {
        let defaults = GraphSettings::default();
        let settings = GraphSettings {
            barrier_smoothing_width: self
                .barrier_smoothing_width
                .unwrap_or(defaults.barrier_smoothing_width),
            retain_leaf_nodes_only: self
                .retain_leaf_nodes_only
                .unwrap_or(defaults.retain_leaf_nodes_only),
        };
        settings.validate()?;
        Ok(settings)
    }
}
