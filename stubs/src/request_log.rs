//! Append-only log of inbound request bodies

use std::sync::{Arc, Mutex};

/// Thread-safe record of raw request bodies in arrival order.
///
/// Clones share the underlying log. The stub server appends while the
/// harness thread reads, so every accessor takes the mutex; index order is
/// arrival order. Strictly append-only between explicit [`clear`] calls.
///
/// [`clear`]: RequestLog::clear
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a body, returning its assigned index.
    pub fn record(&self, body: String) -> usize {
        let mut entries = self.entries.lock().unwrap();
        entries.push(body);
        entries.len() - 1
    }

    /// The most recently recorded body.
    pub fn last(&self) -> Option<String> {
        self.entries.lock().unwrap().last().cloned()
    }

    /// The body recorded at `index`, if any.
    pub fn at(&self, index: usize) -> Option<String> {
        self.entries.lock().unwrap().get(index).cloned()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Snapshot of every recorded body.
    pub fn all(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_assigns_indexes_in_arrival_order() {
        let log = RequestLog::new();
        let bodies = ["b1", "b2", "b3", "b4"];
        for (i, body) in bodies.iter().enumerate() {
            assert_eq!(log.record(body.to_string()), i);
        }
        for (i, body) in bodies.iter().enumerate() {
            assert_eq!(log.at(i).as_deref(), Some(*body));
        }
        assert_eq!(log.last().as_deref(), Some("b4"));
        assert_eq!(log.count(), 4);
    }

    #[test]
    fn clear_empties_the_log() {
        let log = RequestLog::new();
        log.record("body".to_string());
        log.clear();
        assert_eq!(log.count(), 0);
        assert_eq!(log.last(), None);
        assert_eq!(log.at(0), None);
    }

    #[test]
    fn clones_share_the_same_log() {
        let log = RequestLog::new();
        let writer = log.clone();
        writer.record("shared".to_string());
        assert_eq!(log.count(), 1);
    }
}
