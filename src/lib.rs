//! Beneficial-ownership (UBO) discovery engine.
//!
//! Data flow: root ID → [`registry`] (C2) → payload → [`owner_extractor`]
//! (C3) → owner list → [`tree_resolver`] (C4, recurses via C2/C3, uses
//! [`share_parser`]) → trace → [`ubo_evaluator`] (C5) → UBO set.
//! [`document_comparator`] (C6) and [`graph_projector`] (C7) consume the
//! trace independently.

pub mod config;
pub mod document_comparator;
pub mod error;
pub mod graph_projector;
pub mod owner_extractor;
pub mod registry;
pub mod share_parser;
pub mod tree_resolver;
pub mod types;
pub mod ubo_evaluator;
