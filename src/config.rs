//! Engine configuration
//!
//! Every knob the engine exposes, with the documented defaults. The weights
//! must describe a convex combination for confidence to stay in [0, 1].

use std::time::Duration;

/// Tunable parameters for classification and feedback learning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Weight of the classifier probability in the combined domain score.
    pub ml_weight: f64,
    /// Weight of the TF-IDF centroid cosine-similarity term.
    pub similarity_weight: f64,
    /// Weight of the taxonomy keyword/pattern score.
    pub taxonomy_weight: f64,
    /// Combined score below which (with zero taxonomy signal) the query
    /// falls back to the `other` domain.
    pub unknown_threshold: f64,
    /// Confidence delta contributed per positive feedback.
    pub positive_feedback_step: f64,
    /// Confidence delta removed per negative feedback.
    pub negative_feedback_step: f64,
    /// Upper bound on the cumulative feedback delta for a query key.
    pub delta_ceiling: f64,
    /// Lower bound on the cumulative feedback delta for a query key.
    pub delta_floor: f64,
    /// When false, the ML model is skipped and classification runs on
    /// taxonomy scores alone.
    pub enable_classifier: bool,
    /// Optional per-analysis deadline. Stages that have not started when it
    /// expires are skipped and the result is flagged `partial`.
    pub deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ml_weight: 0.55,
            similarity_weight: 0.25,
            taxonomy_weight: 0.20,
            unknown_threshold: 0.05,
            positive_feedback_step: 0.10,
            negative_feedback_step: 0.05,
            delta_ceiling: 0.30,
            delta_floor: -0.20,
            enable_classifier: true,
            deadline: None,
        }
    }
}
