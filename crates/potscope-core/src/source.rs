//! Line framing over an already-open byte stream.
//!
//! The ingestion loop consumes anything implementing [`LineSource`]. For real
//! devices and replay files that is a [`LineReader`] wrapping a
//! [`std::io::Read`] whose reads are bounded by a timeout (a serial port opened
//! with `.timeout(..)`, a file, or an in-memory cursor in tests).

use std::io::{self, ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Longest line kept before it is emitted unterminated.
pub const MAX_LINE_BYTES: usize = 1024;

/// Bytes requested from the underlying stream per read.
const READ_CHUNK: usize = 256;

/// Events buffered between a [`ThreadedSource`] reader and its consumer.
const THREADED_BACKLOG: usize = 64;

/// Outcome of one attempt to read a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete line, trailing whitespace stripped.
    Line(String),
    /// No complete line arrived within the read timeout. Not an error.
    Timeout,
    /// The stream reached its end.
    Closed,
}

/// A blocking, timeout-bounded producer of text lines.
///
/// `Err` means the stream failed and cannot be read further.
pub trait LineSource: Send {
    fn read_line(&mut self) -> io::Result<ReadEvent>;
}

impl LineSource for Box<dyn LineSource> {
    fn read_line(&mut self) -> io::Result<ReadEvent> {
        (**self).read_line()
    }
}

// ---------------------------------------------------------------------------
// LineReader
// ---------------------------------------------------------------------------

/// Splits a byte stream into lines.
///
/// Partial fragments survive timeouts and are completed by later reads.
/// Invalid UTF-8 is replaced rather than rejected, so one corrupted byte costs
/// at most one line. A line that grows past [`MAX_LINE_BYTES`] without a
/// newline is emitted as-is (and will fail to parse) instead of buffering
/// forever.
pub struct LineReader<R> {
    inner: R,
    pending: Vec<u8>,
    chunk: Vec<u8>,
    max_line: usize,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_line(inner, MAX_LINE_BYTES)
    }

    pub fn with_max_line(inner: R, max_line: usize) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            chunk: vec![0u8; READ_CHUNK],
            max_line: max_line.max(1),
            eof: false,
        }
    }

    /// Pop the next complete (or overlong) line from the pending bytes.
    fn take_line(&mut self) -> Option<String> {
        let search = self.pending.len().min(self.max_line + 1);
        if let Some(pos) = self.pending[..search].iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            return Some(decode(&line[..pos]));
        }
        if self.pending.len() >= self.max_line {
            let line: Vec<u8> = self.pending.drain(..self.max_line).collect();
            log::debug!("line exceeded {} bytes without newline", self.max_line);
            return Some(decode(&line));
        }
        None
    }
}

impl<R: Read + Send> LineSource for LineReader<R> {
    fn read_line(&mut self) -> io::Result<ReadEvent> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadEvent::Line(line));
            }
            if self.eof {
                if self.pending.is_empty() {
                    return Ok(ReadEvent::Closed);
                }
                let rest = std::mem::take(&mut self.pending);
                return Ok(ReadEvent::Line(decode(&rest)));
            }
            match self.inner.read(&mut self.chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&self.chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(ReadEvent::Timeout);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

// ---------------------------------------------------------------------------
// ThreadedSource
// ---------------------------------------------------------------------------

/// Gives a source whose reads never time out (stdin, a pipe) a read timeout.
///
/// The inner source runs on a helper thread and its events arrive over a
/// bounded channel. Each [`read_line`](LineSource::read_line) waits at most
/// `timeout` before reporting [`ReadEvent::Timeout`], so the ingestion loop
/// keeps observing cancellation. Once this side is dropped, the helper exits
/// after its current read returns.
pub struct ThreadedSource {
    events: Receiver<io::Result<ReadEvent>>,
    timeout: Duration,
}

impl ThreadedSource {
    pub fn spawn<S>(mut source: S, timeout: Duration) -> io::Result<Self>
    where
        S: LineSource + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(THREADED_BACKLOG);
        thread::Builder::new()
            .name("potscope-reader".into())
            .spawn(move || {
                loop {
                    let event = source.read_line();
                    let last = !matches!(event, Ok(ReadEvent::Line(_) | ReadEvent::Timeout));
                    if tx.send(event).is_err() || last {
                        break;
                    }
                }
            })?;
        Ok(Self {
            events: rx,
            timeout,
        })
    }
}

impl LineSource for ThreadedSource {
    fn read_line(&mut self) -> io::Result<ReadEvent> {
        match self.events.recv_timeout(self.timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => Ok(ReadEvent::Timeout),
            Err(RecvTimeoutError::Disconnected) => Ok(ReadEvent::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
