//! Shared helpers: hex rendering and logging setup.

pub mod hex;
pub mod logging;
