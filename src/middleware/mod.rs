//! Custom middleware implementations.
//!
//! This module contains the correlation middleware that binds request-scoped
//! logging context around every handler invocation.

pub mod correlation;

pub use correlation::*;
