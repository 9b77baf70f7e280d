//! Asynchronous log delivery.
//!
//! Rendered lines go onto a bounded FIFO drained by a single background
//! worker thread, so producing a log event never blocks the caller on I/O.
//! Destinations are fixed at startup. Write failures are retried once by the
//! worker and then counted; they never propagate back to producers.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Upper bound on the wait a producer may incur under [`OverflowPolicy::Block`].
const BLOCK_WAIT: Duration = Duration::from_millis(50);

/// Number of write failures reported via `tracing` before going quiet.
const WRITE_FAILURE_WARN_LIMIT: u64 = 10;

/// What `enqueue` does when the queue is full. Explicit configuration, never
/// silently undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait up to [`BLOCK_WAIT`] for the worker to make room, then drop the
    /// new line and count it.
    Block,
    /// Evict the oldest queued line to make room, counting the eviction.
    DropOldest,
}

impl OverflowPolicy {
    /// Parse a policy name case-insensitively.
    pub fn parse(value: &str) -> Option<OverflowPolicy> {
        match value.to_lowercase().as_str() {
            "block" => Some(OverflowPolicy::Block),
            "drop_oldest" | "drop-oldest" => Some(OverflowPolicy::DropOldest),
            _ => None,
        }
    }
}

/// An output the worker writes rendered lines to.
pub trait Destination: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes lines to stdout (the right stream for container runtimes).
pub struct ConsoleDestination;

impl Destination for ConsoleDestination {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Size-rotated file destination.
///
/// When the active file would exceed `max_bytes`, it is rotated to
/// `<path>.1`, existing backups shift up, and backups beyond `backup_count`
/// are removed.
pub struct RotatingFileDestination {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    file: File,
    written: u64,
}

impl RotatingFileDestination {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            max_bytes,
            backup_count,
            file,
            written,
        })
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backup_count == 0 {
            // No backups kept: truncate in place.
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let _ = fs::remove_file(self.backup_path(self.backup_count));
        for index in (1..self.backup_count).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Destination for RotatingFileDestination {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let incoming = line.len() as u64 + 1;
        if self.written > 0 && self.written + incoming > self.max_bytes {
            self.rotate()?;
        }

        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += incoming;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// In-memory destination for tests and end-to-end output capture.
#[derive(Clone, Default)]
pub struct MemoryDestination {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        lock_unpoisoned(&self.lines).clone()
    }
}

impl Destination for MemoryDestination {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        lock_unpoisoned(&self.lines).push(line.to_string());
        Ok(())
    }
}

struct QueueState {
    buf: VecDeque<String>,
    shutdown: bool,
}

struct SinkShared {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
    write_failures: AtomicU64,
}

/// The bounded queue plus its background worker thread.
///
/// Producers only ever enqueue; all destination I/O happens on the worker.
/// [`LogSink::shutdown`] drains the remaining queue before the worker exits.
pub struct LogSink {
    shared: Arc<SinkShared>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl LogSink {
    /// Start the worker thread over the given destinations.
    pub fn start(
        capacity: usize,
        policy: OverflowPolicy,
        destinations: Vec<Box<dyn Destination>>,
    ) -> Self {
        let shared = Arc::new(SinkShared {
            state: Mutex::new(QueueState {
                buf: VecDeque::with_capacity(capacity),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            policy,
            dropped: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = match thread::Builder::new()
            .name("log-sink".into())
            .spawn(move || run_worker(worker_shared, destinations))
        {
            Ok(handle) => Some(handle),
            Err(error) => {
                tracing::warn!(%error, "failed to spawn log sink worker; output disabled");
                None
            }
        };

        Self {
            shared,
            worker: Mutex::new(handle),
        }
    }

    /// Hand a rendered line to the background worker.
    ///
    /// Never performs I/O. When the queue is full the configured
    /// [`OverflowPolicy`] applies; in the worst case the producer waits
    /// [`BLOCK_WAIT`] and the line is dropped and counted.
    pub fn enqueue(&self, line: String) {
        let mut state = lock_unpoisoned(&self.shared.state);
        if state.shutdown {
            return;
        }

        if state.buf.len() >= self.shared.capacity {
            match self.shared.policy {
                OverflowPolicy::DropOldest => {
                    state.buf.pop_front();
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                }
                OverflowPolicy::Block => {
                    let capacity = self.shared.capacity;
                    state = self
                        .shared
                        .not_full
                        .wait_timeout_while(state, BLOCK_WAIT, |s| {
                            s.buf.len() >= capacity && !s.shutdown
                        })
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0);

                    if state.shutdown {
                        return;
                    }
                    if state.buf.len() >= capacity {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                }
            }
        }

        state.buf.push_back(line);
        drop(state);
        self.shared.not_empty.notify_one();
    }

    /// Lines dropped due to a full queue.
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Destination write failures observed by the worker (after retry).
    pub fn write_failure_count(&self) -> u64 {
        self.shared.write_failures.load(Ordering::Relaxed)
    }

    /// Stop the worker, draining everything still queued first. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = lock_unpoisoned(&self.shared.state);
            state.shutdown = true;
        }
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        let handle = lock_unpoisoned(&self.worker).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: Arc<SinkShared>, mut destinations: Vec<Box<dyn Destination>>) {
    loop {
        let batch: Vec<String> = {
            let mut state = lock_unpoisoned(&shared.state);
            while state.buf.is_empty() && !state.shutdown {
                state = shared
                    .not_empty
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            if state.buf.is_empty() {
                break;
            }
            state.buf.drain(..).collect()
        };
        shared.not_full.notify_all();

        for line in &batch {
            for destination in &mut destinations {
                write_with_retry(&shared, destination.as_mut(), line);
            }
        }
        for destination in &mut destinations {
            let _ = destination.flush();
        }
    }

    for destination in &mut destinations {
        let _ = destination.flush();
    }
}

fn write_with_retry(shared: &SinkShared, destination: &mut dyn Destination, line: &str) {
    if destination.write_line(line).is_ok() {
        return;
    }
    if let Err(error) = destination.write_line(line) {
        let failures = shared.write_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures <= WRITE_FAILURE_WARN_LIMIT {
            tracing::warn!(%error, failures, "log destination write failed; line dropped");
        }
    }
}

/// Keep logging alive even if a producer panicked while holding the lock.
fn lock_unpoisoned<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
