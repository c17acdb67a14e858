//! Field Selection
//!
//! Maps decoded sentences onto the fixed telemetry row shape. Stateless: each
//! sentence yields at most one independent record, and nothing is merged
//! across sentences.

mod selector;

pub use selector::{FieldSelector, SelectedRecord};
