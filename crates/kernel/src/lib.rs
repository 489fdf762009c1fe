//! Core traits, settings, and the module registry shared by every bookshelf crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use bookshelf_db::{Database, Migration};
pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
