//! Shared protocol definitions for the `LineChat` wire format.

pub mod codec;
pub mod event;
pub mod message;
