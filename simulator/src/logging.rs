use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::writer::MakeWriter;

/// Writes log lines to stdout and, optionally, a file.
#[derive(Clone)]
pub(crate) struct LogWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl LogWriter {
    pub(crate) fn new(path: Option<PathBuf>) -> io::Result<Self> {
        let file = match path {
            Some(path) => Some(Arc::new(Mutex::new(File::create(path)?))),
            None => None,
        };
        Ok(Self { file })
    }
}

pub(crate) struct LogWriterGuard {
    file: Option<Arc<Mutex<File>>>,
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriterGuard {
            file: self.file.clone(),
        }
    }
}

fn poisoned() -> io::Error {
    io::Error::other("log file lock poisoned")
}

impl Write for LogWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        if let Some(file) = &self.file {
            file.lock().map_err(|_| poisoned())?.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        if let Some(file) = &self.file {
            file.lock().map_err(|_| poisoned())?.flush()?;
        }
        Ok(())
    }
}

/// The most recent step descriptions, replayed when a run fails.
pub(crate) struct EventLog {
    tail: VecDeque<String>,
    capacity: usize,
}

impl EventLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            tail: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn record(&mut self, event: String) {
        tracing::debug!("{event}");
        if self.tail.len() == self.capacity {
            self.tail.pop_front();
        }
        self.tail.push_back(event);
    }

    pub(crate) fn dump_failure(&self, reason: &str) {
        tracing::error!("failure: {reason}");
        tracing::error!("last {} steps:", self.tail.len());
        for event in &self.tail {
            tracing::error!("  {event}");
        }
    }
}
