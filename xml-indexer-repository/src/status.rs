//! Rolling log of indexing status messages.
//!
//! Keeps the most recent messages for an external status page. Every message
//! is stamped with the local time and the index size at the moment it was
//! recorded. When the log is full the oldest message is evicted.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::Local;
use tracing::info;

/// Default number of messages retained.
pub const DEFAULT_STATUS_LOG_CAPACITY: usize = 750;

/// Fixed-capacity ring buffer of status messages.
#[derive(Debug)]
pub struct IndexingStatusLog {
    capacity: usize,
    messages: Mutex<VecDeque<String>>,
}

impl IndexingStatusLog {
    /// Create a log that retains at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a message, evicting the oldest one if the log is full.
    ///
    /// # Arguments
    ///
    /// * `message` - The status text
    /// * `index_size` - Number of documents in the index right now
    pub fn record(&self, message: &str, index_size: usize) {
        let stamp = Local::now().format("%a, %b %-d %-I:%M:%S %p");
        let line = format!("{} {} [Index size: {}]", stamp, message, index_size);
        info!(index_size, "{}", message);

        let mut messages = self.lock();
        messages.push_back(line);
        while messages.len() > self.capacity {
            messages.pop_front();
        }
    }

    /// Copy of the retained messages, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for IndexingStatusLog {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_formats_index_size() {
        let log = IndexingStatusLog::new(10);
        log.record("Indexing started.", 42);

        let messages = log.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with(" Indexing started. [Index size: 42]"));
    }

    #[test]
    fn test_oldest_message_is_evicted() {
        let log = IndexingStatusLog::new(3);
        for i in 0..5 {
            log.record(&format!("message {}", i), i);
        }

        let messages = log.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("message 2"));
        assert!(messages[2].contains("message 4"));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let log = IndexingStatusLog::new(0);
        log.record("a", 0);
        log.record("b", 0);
        assert_eq!(log.len(), 1);
        assert_eq!(log.capacity(), 1);
    }
}
