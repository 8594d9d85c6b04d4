//! Chat-protocol client port.

pub mod client;

pub use client::ChatClient;
