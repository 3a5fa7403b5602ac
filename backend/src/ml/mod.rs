//! Yield prediction engine
//!
//! Feature building, bagged regression trees, and the versioned model slot
//! the forecast service reads from. Everything in this module is pure
//! except `ModelSlot`, which holds the shared model behind an async lock.

pub mod features;
pub mod forest;
pub mod model;

pub use features::{FeatureBuilder, FeatureVector, FEATURE_SCHEMA_VERSION, FEATURE_WIDTH};
pub use forest::{ForestParams, RegressionForest};
pub use model::{ModelSlot, Prediction, TrainedModel, TrainingConfig};
