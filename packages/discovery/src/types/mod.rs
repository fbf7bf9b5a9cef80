//! Data types for the discovery pipeline.

pub mod config;
pub mod dataset;
pub mod query;
pub mod result;
pub mod sample;
pub mod variant;
