//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (controller.rs):
//!     Created → Starting → start hooks in construction order → Running
//!     any hook failure → reverse-order stop of started features → Closed
//!
//! Close (controller.rs):
//!     Running → Stopping → stop hooks in reverse order → Closed
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → orderly close; a second signal forces exit
//! ```
//!
//! # Design Decisions
//! - States progress strictly forward; a closed instance never restarts
//! - Shutdown is best-effort: stop failures are collected, not fail-fast
//! - Start/close take `&mut self`, so concurrent misuse is a compile error

pub mod controller;
pub mod shutdown;
pub mod signals;

pub use controller::{LifecycleController, LifecycleError, LifecycleState};
pub use shutdown::ShutdownSignal;
