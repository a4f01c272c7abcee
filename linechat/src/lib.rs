//! `LineChat`: client for a line-based TCP chat protocol.

pub mod client;
pub mod config;
pub mod console;
pub mod transport;
