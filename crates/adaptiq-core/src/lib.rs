//! adaptiq-core: Adaptive question selection, difficulty model, and scoring.
//!
//! This crate defines the data model, collaborator traits, and the selection
//! engine that the rest of adaptiq builds on.

pub mod corpus;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod exam;
pub mod memory;
pub mod model;
pub mod scoring;
pub mod statistics;
pub mod store;
pub mod traits;
pub mod transcript;
