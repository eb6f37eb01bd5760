//! Vigil Core - Shared functionality for the Vigil console crates

pub mod ids;
pub mod paths;

pub use paths::Paths;
