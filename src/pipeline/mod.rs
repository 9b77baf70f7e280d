//! The structured log event pipeline.
//!
//! An event flows through the pipeline in a fixed order: the caller's fields
//! are merged with the request-scoped correlation context, the processor
//! chain runs (app context, sensitive-data masking, SQL password censoring),
//! the renderer serializes the result, and the sink queues the line for the
//! background writer. Producing an event never blocks on I/O.
//!
//! The pipeline is an explicit, constructed object — there is no process-wide
//! logger registry. Call sites receive a [`LogPipeline`] (cheap to clone) and
//! create named [`Logger`]s from it.

pub mod context;
pub mod processors;
pub mod render;
pub mod sink;

pub use processors::{
    AddAppContext, AddGitCommit, CensorSqlPasswords, MaskSensitiveData, Processor, REDACTED,
};
pub use render::RenderMode;
pub use sink::{
    ConsoleDestination, Destination, LogSink, MemoryDestination, OverflowPolicy,
    RotatingFileDestination,
};

use crate::config::LoggingConfig;
use crate::models::{LogEvent, LogLevel};
use serde_json::Value;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Number of processor faults reported via `tracing` before going quiet.
const PROCESSOR_FAULT_WARN_LIMIT: u64 = 10;

/// Errors raised while constructing a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open log file {path}: {source}")]
    FileSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

struct PipelineInner {
    level: LogLevel,
    mode: RenderMode,
    processors: Vec<Box<dyn Processor>>,
    sink: LogSink,
    processor_faults: AtomicU64,
}

/// Handle to a constructed log pipeline. Clones share the same processor
/// chain and sink.
#[derive(Clone)]
pub struct LogPipeline {
    inner: Arc<PipelineInner>,
}

impl LogPipeline {
    /// Build a pipeline from configuration: console destination, optional
    /// rotating file, and the standard processor chain.
    pub fn new(config: &LoggingConfig) -> Result<Self, PipelineError> {
        let mut destinations: Vec<Box<dyn Destination>> = vec![Box::new(ConsoleDestination)];

        if config.file_logging_enabled {
            let path = config.log_dir.join("app.log");
            let file = RotatingFileDestination::open(
                &path,
                config.rotation_max_bytes,
                config.rotation_backup_count,
            )
            .map_err(|source| PipelineError::FileSink { path, source })?;
            destinations.push(Box::new(file));
        }

        Ok(Self::with_destinations(config, destinations))
    }

    /// Build a pipeline writing to the given destinations instead of the
    /// configured ones. Used by tests and embedders that capture output.
    pub fn with_destinations(
        config: &LoggingConfig,
        destinations: Vec<Box<dyn Destination>>,
    ) -> Self {
        let processors: Vec<Box<dyn Processor>> = vec![
            Box::new(AddAppContext::new(
                config.app_name.clone(),
                config.environment.as_str(),
            )),
            Box::new(MaskSensitiveData),
            Box::new(CensorSqlPasswords::new()),
            Box::new(AddGitCommit::from_env()),
        ];
        Self::build(config, processors, destinations)
    }

    fn build(
        config: &LoggingConfig,
        processors: Vec<Box<dyn Processor>>,
        destinations: Vec<Box<dyn Destination>>,
    ) -> Self {
        let sink = LogSink::start(config.queue_capacity, config.overflow_policy, destinations);

        Self {
            inner: Arc::new(PipelineInner {
                level: config.log_level,
                mode: config.environment.render_mode(),
                processors,
                sink,
                processor_faults: AtomicU64::new(0),
            }),
        }
    }

    /// Create a named logger backed by this pipeline.
    pub fn logger(&self, name: impl Into<String>) -> Logger {
        Logger {
            name: name.into(),
            pipeline: self.clone(),
        }
    }

    /// Lines dropped by the sink due to a full queue.
    pub fn dropped_count(&self) -> u64 {
        self.inner.sink.dropped_count()
    }

    /// Processor faults contained so far.
    pub fn processor_fault_count(&self) -> u64 {
        self.inner.processor_faults.load(Ordering::Relaxed)
    }

    /// Stop the sink worker, draining queued lines first. Idempotent.
    pub fn shutdown(&self) {
        self.inner.sink.shutdown();
    }

    fn emit(&self, mut event: LogEvent) {
        if event.level < self.inner.level {
            return;
        }

        // Merge correlation context; caller-supplied fields win.
        for (name, value) in context::snapshot() {
            event.fields.entry(name).or_insert(value);
        }

        // A faulting processor must not lose the event or reach the caller:
        // keep the fields as processed so far and move on.
        for processor in &self.inner.processors {
            let fields = event.fields.clone();
            match catch_unwind(AssertUnwindSafe(|| processor.process(fields))) {
                Ok(fields) => event.fields = fields,
                Err(_) => {
                    let faults = self.inner.processor_faults.fetch_add(1, Ordering::Relaxed) + 1;
                    if faults <= PROCESSOR_FAULT_WARN_LIMIT {
                        tracing::warn!(
                            processor = processor.name(),
                            "log processor panicked; event emitted with partial processing"
                        );
                    }
                }
            }
        }

        let line = render::render(self.inner.mode, &event);
        self.inner.sink.enqueue(line);
    }
}

/// A named logger handle. Each level method starts an [`EventBuilder`].
#[derive(Clone)]
pub struct Logger {
    name: String,
    pipeline: LogPipeline,
}

impl Logger {
    pub fn log(&self, level: LogLevel, event_name: impl Into<String>) -> EventBuilder {
        EventBuilder {
            pipeline: self.pipeline.clone(),
            event: LogEvent::new(level, self.name.clone(), event_name),
        }
    }

    pub fn debug(&self, event_name: impl Into<String>) -> EventBuilder {
        self.log(LogLevel::Debug, event_name)
    }

    pub fn info(&self, event_name: impl Into<String>) -> EventBuilder {
        self.log(LogLevel::Info, event_name)
    }

    pub fn warn(&self, event_name: impl Into<String>) -> EventBuilder {
        self.log(LogLevel::Warn, event_name)
    }

    pub fn error(&self, event_name: impl Into<String>) -> EventBuilder {
        self.log(LogLevel::Error, event_name)
    }

    pub fn critical(&self, event_name: impl Into<String>) -> EventBuilder {
        self.log(LogLevel::Critical, event_name)
    }
}

/// Builder collecting an event's fields before it enters the pipeline.
#[must_use = "an event does nothing until emit() is called"]
pub struct EventBuilder {
    pipeline: LogPipeline,
    event: LogEvent,
}

impl EventBuilder {
    /// Attach a structured field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.fields.insert(name.into(), value.into());
        self
    }

    /// Attach error text, rendered as `exception` (JSON) or a trailing block
    /// (human).
    pub fn error_text(mut self, text: impl Into<String>) -> Self {
        self.event.error = Some(text.into());
        self
    }

    /// Attach an error, capturing its display text and source chain.
    pub fn error(self, error: &dyn std::error::Error) -> Self {
        let mut text = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            text.push_str("\ncaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.error_text(text)
    }

    /// Hand the event to the pipeline.
    pub fn emit(self) {
        self.pipeline.emit(self.event);
    }
}
