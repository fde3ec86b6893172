//! Test doubles for the probe and card seams.
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cards::{CardId, CardLocation, CardSender, CardUpdate, Controls, DeliveryError};
use crate::probe::{StatusProbe, StatusSnapshot};

/// Always answers with the same online snapshot after `delay`.
pub(crate) struct ScriptedProbe {
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    async fn probe(&self, _target: &str) -> StatusSnapshot {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        StatusSnapshot {
            online: true,
            players: 3,
            max_players: 20,
            motd: "§aWelcome".to_string(),
            icon: None,
        }
    }
}

/// Records every card operation. Deleted cards reject edits and no longer
/// resolve.
#[derive(Default)]
pub(crate) struct RecordingCards {
    next_id: AtomicU64,
    reject_publish: AtomicBool,
    published: Mutex<Vec<(String, CardUpdate)>>,
    updates: Mutex<Vec<CardLocation>>,
    update_attempts: AtomicUsize,
    controls: Mutex<Vec<(CardLocation, Controls)>>,
    deleted: Mutex<HashSet<CardId>>,
    scheduled_failures: Mutex<VecDeque<u16>>,
}

impl RecordingCards {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reject_publish(&self) {
        self.reject_publish.store(true, Ordering::SeqCst);
    }

    pub(crate) fn delete(&self, id: &str) {
        self.deleted.lock().unwrap().insert(id.to_string());
    }

    /// The next update attempt is rejected once with `status`.
    pub(crate) fn fail_next_update(&self, status: u16) {
        self.scheduled_failures.lock().unwrap().push_back(status);
    }

    fn is_deleted(&self, id: &str) -> bool {
        self.deleted.lock().unwrap().contains(id)
    }

    pub(crate) fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Successful full refreshes, across all cards.
    pub(crate) fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub(crate) fn updates_for(&self, id: &str) -> usize {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|location| location.message_id == id)
            .count()
    }

    pub(crate) fn update_attempts(&self) -> usize {
        self.update_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn last_controls(&self, id: &str) -> Option<Controls> {
        self.controls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(location, _)| location.message_id == id)
            .map(|(_, controls)| controls.clone())
    }

    fn unknown_message() -> DeliveryError {
        DeliveryError::Rejected {
            status: 404,
            body: "Unknown Message".to_string(),
        }
    }
}

#[async_trait]
impl CardSender for RecordingCards {
    async fn publish(
        &self,
        channel_id: &str,
        update: &CardUpdate,
    ) -> Result<CardLocation, DeliveryError> {
        if self.reject_publish.load(Ordering::SeqCst) {
            return Err(DeliveryError::Rejected {
                status: 403,
                body: "Missing Access".to_string(),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.published
            .lock()
            .unwrap()
            .push((channel_id.to_string(), update.clone()));
        Ok(CardLocation {
            channel_id: channel_id.to_string(),
            message_id: id.to_string(),
        })
    }

    async fn update(&self, location: &CardLocation, _update: &CardUpdate) -> Result<(), DeliveryError> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        if self.is_deleted(&location.message_id) {
            return Err(Self::unknown_message());
        }
        if let Some(status) = self.scheduled_failures.lock().unwrap().pop_front() {
            return Err(DeliveryError::Rejected {
                status,
                body: "scheduled failure".to_string(),
            });
        }
        self.updates.lock().unwrap().push(location.clone());
        Ok(())
    }

    async fn set_controls(
        &self,
        location: &CardLocation,
        controls: &Controls,
    ) -> Result<(), DeliveryError> {
        if self.is_deleted(&location.message_id) {
            return Err(Self::unknown_message());
        }
        self.controls
            .lock()
            .unwrap()
            .push((location.clone(), controls.clone()));
        Ok(())
    }

    async fn resolve(&self, location: &CardLocation) -> Result<bool, DeliveryError> {
        Ok(!self.is_deleted(&location.message_id))
    }
}
