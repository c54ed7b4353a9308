//! Test doubles shared by unit tests.

use crate::error::TransportError;
use crate::transport::Transport;
use log::{LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

/// Ordered record of named calls, shared between mocks.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn push(&self, entry: &'static str) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// Number of times a transport was released.
#[derive(Debug, Clone, Default)]
pub struct StopCount(Arc<AtomicUsize>);

impl StopCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Poll budgets a transport was handed, in order.
#[derive(Debug, Clone, Default)]
pub struct Budgets(Arc<Mutex<Vec<Duration>>>);

impl Budgets {
    pub fn get(&self) -> Vec<Duration> {
        self.0.lock().unwrap().clone()
    }
}

/// Transport that logs `"poll"` on every poll, records its budgets and
/// counts `stop` calls.
pub struct RecordingTransport {
    log: CallLog,
    stops: StopCount,
    budgets: Budgets,
    fail_poll: bool,
    on_stop: Option<Box<dyn FnMut() + Send>>,
}

impl RecordingTransport {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            stops: StopCount::default(),
            budgets: Budgets::default(),
            fail_poll: false,
            on_stop: None,
        }
    }

    pub fn failing_poll(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    pub fn on_stop(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }

    pub fn stop_count(&self) -> StopCount {
        self.stops.clone()
    }

    pub fn budgets(&self) -> Budgets {
        self.budgets.clone()
    }
}

impl Transport for RecordingTransport {
    fn poll(&mut self, budget: Duration) -> Result<(), TransportError> {
        self.log.push("poll");
        self.budgets.0.lock().unwrap().push(budget);
        if self.fail_poll {
            return Err(TransportError::Other("peer reset".into()));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.0.fetch_add(1, Ordering::SeqCst);
        if let Some(f) = self.on_stop.as_mut() {
            f();
        }
    }
}

struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let line = format!("{} {}", record.level(), record.args());
        self.lines.lock().unwrap().push(line);
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};

/// Install the capturing logger once per test binary.
pub fn init_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Debug);
        }
    });
}

/// Captured log lines mentioning `needle`.
pub fn log_lines(needle: &str) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|l| l.contains(needle))
        .cloned()
        .collect()
}
