//! Bookshelf application library
//!
//! The book catalog module and the bootstrap that wires it to storage and HTTP.

pub mod app;
pub mod modules;

pub use app::{run, App};
