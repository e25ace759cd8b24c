//! Bounded ring of recently finished visible clips.

use std::collections::VecDeque;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;

const CAPACITY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(skip)]
    pub start_time: SystemTime,
    pub title: String,
    pub skipped: bool,
    pub user_scheduled: bool,
}

pub struct History {
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl History {
    pub fn new() -> Self {
        History {
            entries: Mutex::new(VecDeque::with_capacity(CAPACITY)),
        }
    }

    /// Appends an entry unless the clip is hidden, dropping the oldest
    /// entry on overflow.
    pub fn record_end(&self, name: String, hidden: bool, skipped: bool, user_scheduled: bool) {
        if hidden {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() == CAPACITY {
            entries.pop_front();
        }
        entries.push_back(HistoryEntry {
            start_time: SystemTime::now(),
            title: name,
            skipped,
            user_scheduled,
        });
    }

    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().cloned().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        History::new()
    }
}
