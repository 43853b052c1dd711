//! Operation journal
//!
//! Every mutating vault operation opens a `JournalCollection`, appends the notes
//! produced while it runs and commits the collection to the vault's `Journal`.
//! The journal is bounded: once it holds more than its capacity, the oldest
//! collections are pruned.

use std::collections::VecDeque;

use candid::CandidType;
use serde::Deserialize;

use crate::{constants::MAX_JOURNAL_COLLECTIONS, types::StrategyId, utils::error::VaultResult};

/// Category of a journal entry
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq)]
pub enum LogType {
    Info,
    Deposit,
    Redemption,
    Deployment,
    Rebalance,
    Valuation,
    Operator,
}

/// Journal entry
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub timestamp: u64,
    pub entry: VaultResult<()>,
    pub log_type: LogType,
    pub note: Option<String>,
}

/// All entries produced by one operation
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct JournalCollection {
    pub start_date_and_time: u64,
    pub end_date_and_time: u64,
    pub strategy: Option<StrategyId>,
    pub entries: Vec<JournalEntry>,
}

impl JournalCollection {
    /// Opens a new collection, optionally tagged with a strategy key
    pub fn open(timestamp: u64, strategy: Option<StrategyId>) -> Self {
        Self {
            start_date_and_time: timestamp,
            end_date_and_time: timestamp,
            strategy,
            entries: vec![],
        }
    }

    /// Appends a note to the collection
    pub fn append_note<S: AsRef<str>>(
        &mut self,
        entry: VaultResult<()>,
        log_type: LogType,
        note: S,
    ) -> &mut Self {
        self.entries.push(JournalEntry {
            timestamp: self.end_date_and_time,
            entry,
            log_type,
            note: Some(note.as_ref().to_string()),
        });
        self
    }

    /// Stamps the closing time of the collection
    pub fn close(&mut self, timestamp: u64) -> &mut Self {
        self.end_date_and_time = timestamp;
        self
    }

    /// Returns `true` if any entry recorded an error
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|entry| entry.entry.is_err())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bounded, in-order store of committed collections
#[derive(Clone, Debug)]
pub struct Journal {
    collections: VecDeque<JournalCollection>,
    capacity: usize,
}

impl Default for Journal {
    fn default() -> Self {
        Self::with_capacity(MAX_JOURNAL_COLLECTIONS)
    }
}

impl Journal {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            collections: VecDeque::new(),
            capacity,
        }
    }

    /// Commits a collection. Empty collections are dropped.
    pub fn commit(&mut self, collection: JournalCollection) {
        if collection.is_empty() {
            return;
        }
        self.collections.push_back(collection);
        self.cleanup();
    }

    /// Changes the capacity and prunes if needed
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.cleanup();
    }

    /// Removes the oldest collections beyond the capacity
    fn cleanup(&mut self) {
        while self.collections.len() > self.capacity {
            self.collections.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JournalCollection> {
        self.collections.iter()
    }

    pub fn last(&self) -> Option<&JournalCollection> {
        self.collections.back()
    }

    /// Collections tagged with the given strategy key
    pub fn for_strategy(&self, strategy: StrategyId) -> Vec<&JournalCollection> {
        self.collections
            .iter()
            .filter(|collection| collection.strategy == Some(strategy))
            .collect()
    }
}
