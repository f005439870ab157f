//! Append-only JSONL file writer.
//!
//! Each setup step runs in its own short-lived process, so several processes
//! may append to the same file over time. Lines are flushed one at a time.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// File writer that appends to the central log file.
#[derive(Clone)]
pub struct CentralLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl CentralLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);

        // Owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for CentralLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// MakeWriter implementation for tracing-subscriber
#[derive(Clone)]
pub struct WriterFactory {
    writer: CentralLogWriter,
}

impl WriterFactory {
    pub fn new(writer: CentralLogWriter) -> Self {
        Self { writer }
    }
}

impl<'a> MakeWriter<'a> for WriterFactory {
    type Writer = CentralLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer.clone()
    }
}
