//! Network primitives shared by inbound handlers.

pub mod listener;

pub use listener::{BoundedListener, ConnectionPermit};
