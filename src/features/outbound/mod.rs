//! Built-in outbound handlers.

pub mod blackhole;
pub mod freedom;
