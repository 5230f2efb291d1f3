//! Bounded in-game log shown to players.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Oldest entries are dropped past this many
pub const LOG_CAPACITY: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    System,
    Build,
    Roll,
    Production,
    Discard,
    Robber,
    Trade,
    Dev,
    Discover,
    Turn,
    Victory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub kind: LogKind,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameLog {
    next_id: u64,
    entries: VecDeque<LogEntry>,
}

impl GameLog {
    pub fn push(&mut self, kind: LogKind, text: impl Into<String>) {
        self.next_id += 1;
        self.entries.push_back(LogEntry {
            id: self.next_id,
            kind,
            text: text.into(),
        });
        while self.entries.len() > LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}
