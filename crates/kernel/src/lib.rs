//! Core traits, settings, and module registry shared by every shelf crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module, TableSchema};
pub use registry::ModuleRegistry;
