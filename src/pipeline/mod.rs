//! Orchestration over the collaborator traits.

pub mod inspector;

pub use inspector::{LayerInspector, LayerReport};
