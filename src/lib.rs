//! Tweight Log - a structured log event pipeline with request correlation
//!
//! Log events are key-value maps run through an ordered chain of pure
//! processors (app context, sensitive-data masking, SQL password censoring)
//! before being rendered and handed to a bounded queue drained by a
//! background writer. A request-scoped correlation context — isolated per
//! concurrent request by construction — attaches a request id and related
//! fields to every event emitted during that request's handling.
//!
//! ## Architecture
//!
//! The codebase is organized into focused modules:
//! - `models/` - Event structures and severity levels
//! - `pipeline/` - Context store, processor chain, renderers, and sink
//! - `middleware/` - Correlation middleware for actix-web
//! - `utils/` - Request-information helpers
//! - `config/` - Configuration structures and environment loading
//!
//! ## Quick Start
//!
//! ```no_run
//! use tweight_log::{LogPipeline, LoggingConfig};
//!
//! let config = LoggingConfig::from_env();
//! let pipeline = LogPipeline::new(&config).expect("log pipeline");
//!
//! pipeline
//!     .logger("item_manager")
//!     .info("item_created")
//!     .field("item_id", "123")
//!     .emit();
//!
//! pipeline.shutdown();
//! ```

// Core modules
pub mod config;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types and functions for convenience
pub use config::{Environment, LoggingConfig};
pub use middleware::{CorrelationMiddleware, CorrelationService};
pub use models::{LogEvent, LogLevel};
pub use pipeline::{
    ConsoleDestination, Destination, EventBuilder, LogPipeline, Logger, MemoryDestination,
    OverflowPolicy, PipelineError, Processor, REDACTED, RenderMode, RotatingFileDestination,
    context,
};
pub use utils::{extract_client_ip, extract_user_agent};
