//! Configuration structures and loading utilities.
//!
//! This module contains all configuration structures used by the pipeline,
//! including environment variable loading and default values.

pub mod logging;

pub use logging::*;
