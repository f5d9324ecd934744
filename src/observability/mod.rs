//! Observability subsystem.
//!
//! Structured logging initialization lives here; metric exposition is the
//! built-in `metrics` app's job.

pub mod logging;
