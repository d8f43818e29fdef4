//! Cross-resource search: identifier resolution and aggregation

pub mod resolve;
pub mod service;
