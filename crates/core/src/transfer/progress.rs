//! Byte-level progress for a single transfer
//!
//! Progress counts the bytes this crate reads from the source file. Each
//! byte range is read exactly once per transfer: a part that is retried
//! reuses the buffer already read, and any re-reading the SDK does to sign
//! or resend a request happens on that buffer and is not observed here.
//! A transfer therefore finishes at exactly 100%.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback invoked after every source read
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Snapshot delivered to a [`ProgressCallback`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub bytes_read: u64,
    pub total_bytes: u64,
}

impl ProgressUpdate {
    /// `round(bytes_read / total_bytes * 100)`; an empty transfer is 100%
    pub fn percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 100;
        }
        let scaled = self.bytes_read as u128 * 100;
        let total = self.total_bytes as u128;
        ((scaled + total / 2) / total) as u64
    }
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total read:{} progress:{}%",
            self.bytes_read,
            self.percent()
        )
    }
}

/// Cumulative bytes read for one transfer
///
/// Shared by every part of the transfer, so updates are atomic and the
/// callback may run on whichever task performed the read.
pub struct ProgressTracker {
    total_bytes: u64,
    bytes_read: AtomicU64,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            total_bytes,
            bytes_read: AtomicU64::new(0),
            callback,
        }
    }

    pub fn on_bytes_read(&self, n: u64) {
        let bytes_read = self.bytes_read.fetch_add(n, Ordering::SeqCst) + n;
        if let Some(callback) = &self.callback {
            callback(ProgressUpdate {
                bytes_read,
                total_bytes: self.total_bytes,
            });
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            bytes_read: self.bytes_read(),
            total_bytes: self.total_bytes,
        }
    }

    pub fn percent(&self) -> u64 {
        self.snapshot().percent()
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_bytes", &self.total_bytes)
            .field("bytes_read", &self.bytes_read())
            .finish()
    }
}

/// Reader that reports every successful read to a tracker
pub struct ProgressReader<R> {
    inner: R,
    tracker: Arc<ProgressTracker>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, tracker: Arc<ProgressTracker>) -> Self {
        Self { inner, tracker }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.tracker.on_bytes_read(n as u64);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_tracker(total: u64) -> (Arc<ProgressTracker>, Arc<Mutex<Vec<ProgressUpdate>>>) {
        let seen = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |update: ProgressUpdate| sink.lock().unwrap().push(update));
        (Arc::new(ProgressTracker::new(total, Some(callback))), seen)
    }

    #[test]
    fn test_percent_rounds() {
        let update = |bytes_read| ProgressUpdate {
            bytes_read,
            total_bytes: 3,
        };
        assert_eq!(update(0).percent(), 0);
        assert_eq!(update(1).percent(), 33);
        assert_eq!(update(2).percent(), 67);
        assert_eq!(update(3).percent(), 100);
    }

    #[test]
    fn test_percent_empty_total_is_guarded() {
        let tracker = ProgressTracker::new(0, None);
        assert_eq!(tracker.percent(), 100);
    }

    #[test]
    fn test_percent_non_decreasing_and_reaches_100() {
        let (tracker, seen) = recording_tracker(15_000_000);
        for chunk in [0, 1, 262_144, 5_737_855, 6_000_000, 3_000_000] {
            tracker.on_bytes_read(chunk);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 6);
        assert!(seen.windows(2).all(|w| w[0].percent() <= w[1].percent()));
        assert!(seen.windows(2).all(|w| w[0].bytes_read <= w[1].bytes_read));
        assert_eq!(seen.last().unwrap().bytes_read, 15_000_000);
        assert_eq!(tracker.percent(), 100);
    }

    #[test]
    fn test_display_format() {
        let update = ProgressUpdate {
            bytes_read: 3_000_000,
            total_bytes: 15_000_000,
        };
        assert_eq!(update.to_string(), "total read:3000000 progress:20%");
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let tracker = Arc::new(ProgressTracker::new(8 * 1000, None));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        tracker.on_bytes_read(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.bytes_read(), 8000);
        assert_eq!(tracker.percent(), 100);
    }

    #[test]
    fn test_progress_reader_counts_each_read() {
        let (tracker, seen) = recording_tracker(10);
        let mut reader = ProgressReader::new(&b"0123456789"[..], tracker.clone());

        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();

        assert_eq!(rest, b"456789");
        assert_eq!(tracker.bytes_read(), 10);
        // The trailing zero-length read at EOF is not reported
        assert!(seen.lock().unwrap().iter().all(|u| u.bytes_read > 0));
    }
}
