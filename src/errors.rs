//! Error types for rapid_relatedness
//!
//! This module defines the error types used throughout the library.
//! Errors fall into three families: build-fatal (a category graph that must
//! not be served), training-fatal (nothing to fit), and per-query failures
//! that an ensemble can absorb by interpolation.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelatednessError>;

/// Main error type for rapid_relatedness
#[derive(Error, Debug, Clone)]
pub enum RelatednessError {
    /// Category graph adjacency bookkeeping is inconsistent
    #[error("Category graph invariant violated: {message}")]
    GraphInvariant { message: String },

    /// Rank-to-cost transform produced costs outside `(0, 1)` at the minimum
    #[error("Category costs are inverted or degenerate (min_cost={min_cost})")]
    CostDirection { min_cost: f64 },

    /// Training was requested without any usable examples
    #[error("No training data: {message}")]
    NoTrainingData { message: String },

    /// A trained model was used before training or loading
    #[error("Model '{model}' has not been trained")]
    NotTrained { model: String },

    /// The number of sub-metric inputs does not match the model
    #[error("Dimension mismatch: expected {expected} sub-metrics, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A collaborator (page store, category store, cache) failed
    #[error("Data access error: {message}")]
    DataAccess { message: String },

    /// A single metric failed for one query
    #[error("Metric '{metric}' failed: {message}")]
    MetricFailure { metric: String, message: String },

    /// Every sub-metric of an ensemble failed for one query
    #[error("All sub-metrics failed: {message}")]
    AllMetricsFailed { message: String },

    /// No metric is registered under the requested name
    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Filesystem error while persisting or loading model state
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl RelatednessError {
    /// Create a graph invariant error
    pub fn graph_invariant(message: impl Into<String>) -> Self {
        Self::GraphInvariant {
            message: message.into(),
        }
    }

    /// Create a cost direction error
    pub fn cost_direction(min_cost: f64) -> Self {
        Self::CostDirection { min_cost }
    }

    /// Create a no training data error
    pub fn no_training_data(message: impl Into<String>) -> Self {
        Self::NoTrainingData {
            message: message.into(),
        }
    }

    /// Create a not trained error
    pub fn not_trained(model: impl Into<String>) -> Self {
        Self::NotTrained {
            model: model.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a data access error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess {
            message: message.into(),
        }
    }

    /// Create a metric failure error
    pub fn metric_failure(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetricFailure {
            metric: metric.into(),
            message: message.into(),
        }
    }

    /// Create an all-metrics-failed error
    pub fn all_metrics_failed(message: impl Into<String>) -> Self {
        Self::AllMetricsFailed {
            message: message.into(),
        }
    }

    /// Create an unknown metric error
    pub fn unknown_metric(name: impl Into<String>) -> Self {
        Self::UnknownMetric { name: name.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Check if this error means a category graph must not be served
    pub fn is_build_fatal(&self) -> bool {
        matches!(self, Self::GraphInvariant { .. } | Self::CostDirection { .. })
    }
}

impl From<serde_json::Error> for RelatednessError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for RelatednessError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}
