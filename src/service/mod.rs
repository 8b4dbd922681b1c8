//! High-level client service built on the protocol and transport layers.

pub mod client;

pub use client::AuthClient;
