//! Data models for the log pipeline.
//!
//! This module contains the core event structures shared by the processor
//! chain, renderers, and sink.

pub mod event;

pub use event::*;
