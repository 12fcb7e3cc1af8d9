//! Authentication
//!
//! Holds the user registry consulted by the USER command.

pub mod registry;

pub use registry::UserRegistry;
