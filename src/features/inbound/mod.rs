//! Built-in inbound handlers.

pub mod tcp;
