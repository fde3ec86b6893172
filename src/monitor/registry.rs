//! In-memory monitor state, keyed by card id.
//!
//! Entries are shared as `Arc<MonitorEntry>` and only ever mutated in place:
//! a running ticker holds its own clone of the entry and must observe every
//! stop or restart made through the registry.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::lifecycle::Ticker;
use super::store::PersistedMonitorRecord;
use crate::cards::{CardId, CardLocation};

#[derive(Default)]
struct EntryState {
    stopped: bool,
    /// Bumped on every activation; a ticker only acts for its own generation.
    generation: u64,
    ticker: Option<Ticker>,
}

pub struct MonitorEntry {
    pub id: CardId,
    pub target: String,
    pub owner: String,
    location: CardLocation,
    state: Mutex<EntryState>,
}

impl MonitorEntry {
    fn new(location: CardLocation, target: &str, owner: &str, stopped: bool) -> Self {
        Self {
            id: location.message_id.clone(),
            target: target.to_string(),
            owner: owner.to_string(),
            location,
            state: Mutex::new(EntryState {
                stopped,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn location(&self) -> &CardLocation {
        &self.location
    }

    pub fn is_stopped(&self) -> bool {
        self.state().stopped
    }

    pub fn has_ticker(&self) -> bool {
        self.state().ticker.is_some()
    }

    /// True while the ticker of `generation` is the one allowed to run.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let state = self.state();
        !state.stopped && state.generation == generation
    }

    /// Marks the entry active, cancels any previous ticker and returns the
    /// new generation.
    pub(crate) fn begin_activation(&self) -> u64 {
        let mut state = self.state();
        if let Some(stale) = state.ticker.take() {
            stale.cancel();
        }
        state.stopped = false;
        state.generation += 1;
        state.generation
    }

    /// Installs the ticker for `generation`. Hands it back if a stop or a
    /// newer activation got there first.
    pub(crate) fn attach_ticker(&self, generation: u64, ticker: Ticker) -> Result<(), Ticker> {
        let mut state = self.state();
        if state.stopped || state.generation != generation {
            return Err(ticker);
        }
        state.ticker = Some(ticker);
        Ok(())
    }

    /// Explicit stop. Returns false when the entry was already stopped.
    pub(crate) fn mark_stopped(&self) -> bool {
        let mut state = self.state();
        if state.stopped {
            return false;
        }
        state.stopped = true;
        if let Some(ticker) = state.ticker.take() {
            ticker.cancel();
        }
        true
    }

    /// Failure-triggered stop, issued by the ticker of `generation` itself.
    /// A no-op if that ticker has been superseded in the meantime.
    pub(crate) fn demote(&self, generation: u64) -> bool {
        let mut state = self.state();
        if state.stopped || state.generation != generation {
            return false;
        }
        state.stopped = true;
        if let Some(ticker) = state.ticker.take() {
            ticker.cancel();
        }
        true
    }

    /// Cancels the ticker without recording a stop (process shutdown).
    pub(crate) fn detach_ticker(&self) {
        if let Some(ticker) = self.state().ticker.take() {
            ticker.cancel();
        }
    }

    pub fn to_record(&self) -> PersistedMonitorRecord {
        PersistedMonitorRecord {
            message_id: self.id.clone(),
            channel_id: self.location.channel_id.clone(),
            target: self.target.clone(),
            owner_id: (!self.owner.is_empty()).then(|| self.owner.clone()),
            stopped: self.is_stopped(),
        }
    }
}

#[derive(Default)]
pub struct MonitorRegistry {
    entries: Mutex<HashMap<CardId, Arc<MonitorEntry>>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries_guard(&self) -> MutexGuard<'_, HashMap<CardId, Arc<MonitorEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a stopped entry for the card at `location`. An existing entry
    /// for the same card is returned untouched rather than replaced.
    pub fn create(&self, location: CardLocation, target: &str, owner: &str) -> Arc<MonitorEntry> {
        self.insert_if_absent(MonitorEntry::new(location, target, owner, true))
    }

    pub fn get(&self, id: &str) -> Option<Arc<MonitorEntry>> {
        self.entries_guard().get(id).cloned()
    }

    /// Rehydrates an entry with the persisted `stopped` flag and no ticker.
    pub fn upsert_from_persisted(&self, record: &PersistedMonitorRecord) -> Arc<MonitorEntry> {
        self.insert_if_absent(MonitorEntry::new(
            record.location(),
            &record.target,
            record.owner_id.as_deref().unwrap_or_default(),
            record.stopped,
        ))
    }

    fn insert_if_absent(&self, entry: MonitorEntry) -> Arc<MonitorEntry> {
        self.entries_guard()
            .entry(entry.id.clone())
            .or_insert_with(|| Arc::new(entry))
            .clone()
    }

    /// Forgets an entry, cancelling its ticker if it has one.
    pub fn remove(&self, id: &str) -> Option<Arc<MonitorEntry>> {
        let removed = self.entries_guard().remove(id);
        if let Some(entry) = &removed {
            entry.detach_ticker();
        }
        removed
    }

    /// All entries, ordered by card id.
    pub fn entries(&self) -> Vec<Arc<MonitorEntry>> {
        let mut entries: Vec<_> = self.entries_guard().values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn records(&self) -> Vec<PersistedMonitorRecord> {
        self.entries().iter().map(|entry| entry.to_record()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
