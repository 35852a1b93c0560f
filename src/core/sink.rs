//! Output streams for task runs.
//!
//! Every target writes into an [`OutputSink`]. Sequential runs and
//! `merged_output` tasks use the immediate variant, which forwards each
//! write to the shared process stream as it arrives. Parallel runs use the
//! delayed variant, which holds a target's combined output until the run
//! finishes and then hands the whole block to the shared stream in one write.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard};

const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

/// Process-wide output stream shared by every worker of a fan-out.
///
/// Each `write` call holds the lock for the whole buffer, so a delayed flush
/// can never be split by another worker's bytes.
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
    colored: bool,
}

impl SharedStream {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(out))),
            colored: false,
        }
    }

    /// Stream over the process stdout, colored when stdout is a terminal.
    pub fn stdout() -> Self {
        Self {
            colored: io::stdout().is_terminal(),
            ..Self::new(io::stdout())
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A worker that panicked mid-write leaves the writer itself intact.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write a status line straight to the stream, never buffered.
    pub fn status_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.lock();
        if self.colored {
            writeln!(out, "{}{}{}", BLUE, line, RESET)?;
        } else {
            writeln!(out, "{}", line)?;
        }
        out.flush()
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Buffers everything written to it and releases the buffer to the shared
/// stream exactly once: on [`DelayedWriter::finish`], or on drop if the
/// owner never got that far.
pub struct DelayedWriter {
    buffer: Vec<u8>,
    out: SharedStream,
    flushed: bool,
}

impl DelayedWriter {
    pub fn new(out: SharedStream) -> Self {
        Self {
            buffer: Vec::new(),
            out,
            flushed: false,
        }
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;
        let block = std::mem::take(&mut self.buffer);
        if block.is_empty() {
            return Ok(());
        }
        self.out.write_all(&block)?;
        self.out.flush()
    }
}

impl Write for DelayedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    /// Buffered bytes stay put until the run completes.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for DelayedWriter {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Where one target's combined output goes.
pub enum OutputSink {
    Immediate(SharedStream),
    Delayed(DelayedWriter),
}

impl OutputSink {
    pub fn immediate(out: &SharedStream) -> Self {
        OutputSink::Immediate(out.clone())
    }

    pub fn delayed(out: &SharedStream) -> Self {
        OutputSink::Delayed(DelayedWriter::new(out.clone()))
    }

    /// Pick the sink for a target of a fan-out.
    pub fn for_run(out: &SharedStream, concurrent: bool, merged_output: bool) -> Self {
        if concurrent && !merged_output {
            Self::delayed(out)
        } else {
            Self::immediate(out)
        }
    }

    pub fn is_delayed(&self) -> bool {
        matches!(self, OutputSink::Delayed(_))
    }

    /// Release any held output. Immediate sinks only flush the stream.
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputSink::Immediate(mut out) => out.flush(),
            OutputSink::Delayed(writer) => writer.finish(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Immediate(out) => out.write(buf),
            OutputSink::Delayed(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Immediate(out) => out.flush(),
            OutputSink::Delayed(writer) => writer.flush(),
        }
    }
}
