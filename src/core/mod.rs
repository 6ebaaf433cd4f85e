//! Core error and configuration types shared by every layer of the crate.

pub mod error;
pub mod settings;

pub use error::RandomVariableError;
pub use settings::{DEFAULT_BARRIER_SMOOTHING_WIDTH, GraphSettings, GraphSettingsBuilder};
