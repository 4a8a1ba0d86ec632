//! Activity log for TUI mode
//!
//! `LogBuffer` is a `MakeWriter` target for tracing-subscriber. Lines land in
//! a bounded queue; the status strip shows the newest one and the activity
//! overlay shows the tail.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Lines kept for the activity overlay.
const CAPACITY: usize = 300;

#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, evicting the oldest at capacity. Blank lines are skipped.
    pub fn push(&self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        // A panicking writer must not take logging down with it.
        let mut guard = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        while guard.len() >= CAPACITY {
            guard.pop_front();
        }
        guard.push_back(line.to_string());
    }

    /// Up to `n` most recent lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let guard = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let skip = guard.len().saturating_sub(n);
        guard.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<String> {
        let guard = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        guard.back().cloned()
    }
}

/// Per-event writer; tracing hands it one formatted event at a time.
pub struct LineWriter {
    target: LogBuffer,
    pending: String,
}

impl LineWriter {
    fn emit_complete_lines(&mut self) {
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            self.target.push(&line);
        }
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        self.emit_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.target.push(&rest);
        }
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            target: self.clone(),
            pending: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_and_latest() {
        let log = LogBuffer::new();
        assert!(log.latest().is_none());
        log.push("one");
        log.push("   ");
        log.push("two\n");
        assert_eq!(log.tail(5), vec!["one", "two"]);
        assert_eq!(log.tail(1), vec!["two"]);
        assert_eq!(log.latest().as_deref(), Some("two"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = LogBuffer::new();
        for i in 0..CAPACITY + 20 {
            log.push(&format!("event {}", i));
        }
        let all = log.tail(usize::MAX);
        assert_eq!(all.len(), CAPACITY);
        assert_eq!(all[0], "event 20");
    }

    #[test]
    fn test_writer_splits_lines_and_flushes_rest_on_drop() {
        let log = LogBuffer::new();
        {
            let mut w = log.make_writer();
            write!(w, "INFO signed in\nWARN live chat").unwrap();
            assert_eq!(log.tail(5), vec!["INFO signed in"]);
        }
        assert_eq!(log.tail(5), vec!["INFO signed in", "WARN live chat"]);
    }
}
