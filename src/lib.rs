//! shelf application library
//!
//! Project modules served by the shelf HTTP stack. The `books` module
//! exposes CRUD over book records.

pub mod modules;

pub use modules::*;
