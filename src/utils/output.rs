/// Bounded collection of a child's combined output stream
///
/// A reader thread drains the pipe for the whole life of the child so it never
/// blocks on a full pipe, keeping at most `capture_bytes` of the most recent output.
use crate::config::types::OutputIntegrity;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::Read;
use std::thread;
use std::time::Duration;

/// Output limits configuration
#[derive(Debug, Clone)]
pub struct OutputLimits {
    /// Bytes retained (tail of the stream)
    pub capture_bytes: usize,
    /// How long `finish` waits for the stream to close
    pub collection_timeout: Duration,
}

impl Default for OutputLimits {
    fn default() -> Self {
        OutputLimits {
            capture_bytes: 1024 * 1024,
            collection_timeout: Duration::from_secs(2),
        }
    }
}

/// Output collection result
#[derive(Debug, Clone)]
pub struct OutputResult {
    /// Retained bytes, lossily decoded
    pub text: String,
    pub integrity: OutputIntegrity,
    /// Total bytes read from the stream, including discarded ones
    pub total_bytes: usize,
}

/// Handle to a running collector thread
pub struct OutputCollector {
    limits: OutputLimits,
    rx: Receiver<(Vec<u8>, OutputIntegrity, usize)>,
}

impl OutputCollector {
    /// Start draining `stream` on a background thread
    pub fn spawn<R: Read + Send + 'static>(stream: R, limits: OutputLimits) -> Self {
        let (tx, rx) = bounded(1);
        let capture = limits.capture_bytes;

        thread::spawn(move || {
            let (buffer, integrity, total) = collect_tail(stream, capture);
            let _ = tx.send((buffer, integrity, total));
        });

        OutputCollector { limits, rx }
    }

    /// Wait for the stream to close. If it stays open past the collection timeout
    /// (a straggler still holds the pipe) the reader is abandoned and marked.
    pub fn finish(self) -> OutputResult {
        match self.rx.recv_timeout(self.limits.collection_timeout) {
            Ok((buffer, integrity, total_bytes)) => OutputResult {
                text: String::from_utf8_lossy(&buffer).into_owned(),
                integrity,
                total_bytes,
            },
            Err(RecvTimeoutError::Timeout) => OutputResult {
                text: String::new(),
                integrity: OutputIntegrity::CollectionTimedOut,
                total_bytes: 0,
            },
            Err(RecvTimeoutError::Disconnected) => OutputResult {
                text: String::new(),
                integrity: OutputIntegrity::ReadError,
                total_bytes: 0,
            },
        }
    }
}

/// Read until EOF keeping the last `limit` bytes
fn collect_tail<R: Read>(mut stream: R, limit: usize) -> (Vec<u8>, OutputIntegrity, usize) {
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut total = 0usize;
    let mut integrity = OutputIntegrity::Complete;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                buffer.extend_from_slice(&chunk[..n]);
                // Compact lazily so long streams stay amortized O(n).
                if buffer.len() > limit.saturating_mul(2).max(chunk.len()) {
                    let excess = buffer.len() - limit;
                    buffer.drain(..excess);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => {
                integrity = OutputIntegrity::ReadError;
                break;
            }
        }
    }

    if buffer.len() > limit {
        let excess = buffer.len() - limit;
        buffer.drain(..excess);
    }
    if total > buffer.len() && integrity == OutputIntegrity::Complete {
        integrity = OutputIntegrity::TruncatedHead;
    }

    (buffer, integrity, total)
}
