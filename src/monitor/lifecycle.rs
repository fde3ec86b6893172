//! Starting, stopping, resuming and restoring monitors.
//!
//! Every active entry owns exactly one ticker task. A ticker refreshes the
//! entry's card at once and then once per interval, until its shutdown
//! channel fires or the card turns out to be gone.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::registry::{MonitorEntry, MonitorRegistry};
use super::store::MonitorStore;
use super::token::decode_resume_control;
use crate::cards::{CardLocation, CardSender, CardUpdate, Controls, DeliveryError};
use crate::config::MIN_UPDATE_INTERVAL;
use crate::probe::StatusProbe;
use crate::render::render;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to publish status card: {0}")]
    Publish(#[from] DeliveryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { target: String },
    AlreadyStopped { target: String },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// `cold_start` is set when the entry was rebuilt from the control id.
    Resumed { target: String, cold_start: bool },
    AlreadyActive { target: String },
    NotFound,
}

/// Handle to a running ticker task.
pub(crate) struct Ticker {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl Ticker {
    /// Signals the task to exit before its next tick. A refresh already in
    /// flight is allowed to finish.
    pub(crate) fn cancel(self) {
        if self.shutdown_tx.send(()).is_err() && !self.handle.is_finished() {
            warn!("Failed to send shutdown signal to ticker task; it might have already finished.");
        }
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    registry: Arc<MonitorRegistry>,
    store: Arc<MonitorStore>,
    probe: Arc<dyn StatusProbe>,
    cards: Arc<dyn CardSender>,
    interval: Duration,
}

impl LifecycleEngine {
    pub fn new(
        registry: Arc<MonitorRegistry>,
        store: Arc<MonitorStore>,
        probe: Arc<dyn StatusProbe>,
        cards: Arc<dyn CardSender>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            probe,
            cards,
            interval: interval.max(MIN_UPDATE_INTERVAL),
        }
    }

    pub fn registry(&self) -> &Arc<MonitorRegistry> {
        &self.registry
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Publishes a fresh card for `target` in `channel_id` and starts polling it.
    pub async fn start_monitor(
        &self,
        target: &str,
        owner: &str,
        channel_id: &str,
    ) -> Result<Arc<MonitorEntry>, EngineError> {
        let update = self.render_update(target, Controls::active(target)).await;
        let location = self.cards.publish(channel_id, &update).await?;
        let entry = self.registry.create(location, target, owner);
        info!(monitor_id = %entry.id, address = %target, "Published status card for new monitor.");
        self.activate(&entry).await;
        Ok(entry)
    }

    /// Makes `entry` active: a fresh ticker that refreshes the card at once
    /// and then on every interval. Calling it on an already active entry
    /// replaces its ticker.
    ///
    /// The entry is fully active before the first await, so dropping the
    /// returned future only stops waiting for the immediate refresh.
    pub async fn activate(&self, entry: &Arc<MonitorEntry>) {
        let generation = entry.begin_activation();
        let (refreshed_tx, refreshed_rx) = oneshot::channel();

        let ticker = self.spawn_ticker(entry.clone(), generation, refreshed_tx);
        if let Err(ticker) = entry.attach_ticker(generation, ticker) {
            debug!(monitor_id = %entry.id, "Monitor was stopped or restarted during activation.");
            ticker.cancel();
        }
        self.persist();

        // Err only means the ticker went away before refreshing.
        let _ = refreshed_rx.await;
    }

    pub async fn stop(&self, id: &str) -> StopOutcome {
        let Some(entry) = self.registry.get(id) else {
            return StopOutcome::NotFound;
        };
        if !entry.mark_stopped() {
            return StopOutcome::AlreadyStopped {
                target: entry.target.clone(),
            };
        }
        info!(monitor_id = %entry.id, "Monitor stopped.");
        self.persist();

        if let Err(e) = self
            .cards
            .set_controls(entry.location(), &Controls::stopped(&entry.target))
            .await
        {
            warn!(monitor_id = %entry.id, error = %e, "Failed to switch card controls to stopped.");
        }
        StopOutcome::Stopped {
            target: entry.target.clone(),
        }
    }

    /// Resumes the monitor behind `card`. When the registry has never seen the
    /// card (e.g. the monitors file was lost), the target is recovered from
    /// the resume control id.
    pub async fn resume(&self, card: &CardLocation, control_id: &str, actor_id: &str) -> ResumeOutcome {
        let (entry, cold_start) = match self.registry.get(&card.message_id) {
            Some(entry) => (entry, false),
            None => {
                let Some(target) = decode_resume_control(control_id) else {
                    return ResumeOutcome::NotFound;
                };
                let entry = self.registry.create(card.clone(), &target, actor_id);
                info!(monitor_id = %entry.id, address = %target, "Rebuilt monitor from resume control.");
                self.persist();
                (entry, true)
            }
        };

        if !entry.is_stopped() {
            return ResumeOutcome::AlreadyActive {
                target: entry.target.clone(),
            };
        }
        info!(monitor_id = %entry.id, "Monitor resumed.");
        self.activate(&entry).await;
        ResumeOutcome::Resumed {
            target: entry.target.clone(),
            cold_start,
        }
    }

    /// Restores persisted monitors at startup. Returns how many were restored.
    ///
    /// Every loaded record is registered before anything is written, so a
    /// write made while cards are still being resolved keeps all of them.
    pub async fn rehydrate(&self) -> usize {
        let records = match self.store.load() {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, path = %self.store.path().display(), "Failed to load monitors file.");
                return 0;
            }
        };
        let mut seen = HashSet::new();
        let entries: Vec<_> = records
            .iter()
            .filter(|record| seen.insert(record.message_id.clone()))
            .map(|record| self.registry.upsert_from_persisted(record))
            .collect();

        let mut resolving = JoinSet::new();
        for entry in entries {
            let cards = self.cards.clone();
            resolving.spawn(async move {
                let resolved = cards.resolve(entry.location()).await;
                (entry, resolved)
            });
        }

        let mut restored = Vec::new();
        while let Some(joined) = resolving.join_next().await {
            let Ok((entry, resolved)) = joined else {
                continue;
            };
            match resolved {
                Ok(true) => restored.push(entry),
                Ok(false) => {
                    warn!(monitor_id = %entry.id, "Status card no longer exists; dropping monitor.");
                    self.registry.remove(&entry.id);
                }
                Err(e) => {
                    warn!(monitor_id = %entry.id, error = %e, "Could not resolve status card; dropping monitor.");
                    self.registry.remove(&entry.id);
                }
            }
        }
        self.persist();

        let mut activating = JoinSet::new();
        for entry in &restored {
            let engine = self.clone();
            let entry = entry.clone();
            activating.spawn(async move {
                if entry.is_stopped() {
                    if let Err(e) = engine
                        .cards
                        .set_controls(entry.location(), &Controls::stopped(&entry.target))
                        .await
                    {
                        debug!(monitor_id = %entry.id, error = %e, "Failed to refresh controls of stopped card.");
                    }
                } else {
                    engine.activate(&entry).await;
                }
            });
        }
        while activating.join_next().await.is_some() {}

        info!(restored = restored.len(), "Monitor rehydration complete.");
        restored.len()
    }

    /// Cancels every ticker. Entries keep their active flag so they resume on
    /// the next start.
    pub fn shutdown(&self) {
        for entry in self.registry.entries() {
            entry.detach_ticker();
        }
        info!("All monitor tickers cancelled.");
    }

    /// Writes the registry projection. Failures are logged, never surfaced.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.registry.records()) {
            error!(error = %e, path = %self.store.path().display(), "Failed to persist monitors.");
        }
    }

    async fn render_update(&self, target: &str, controls: Controls) -> CardUpdate {
        let snapshot = self.probe.probe(target).await;
        CardUpdate {
            payload: render(target, &snapshot),
            controls,
        }
    }

    async fn refresh(&self, entry: &MonitorEntry) -> Result<(), DeliveryError> {
        let update = self
            .render_update(&entry.target, Controls::active(&entry.target))
            .await;
        self.cards.update(entry.location(), &update).await
    }

    async fn demote(&self, entry: &MonitorEntry, generation: u64) {
        if !entry.demote(generation) {
            return;
        }
        self.persist();
        if let Err(e) = self
            .cards
            .set_controls(entry.location(), &Controls::stopped(&entry.target))
            .await
        {
            debug!(monitor_id = %entry.id, error = %e, "Failed to switch controls of demoted card.");
        }
    }

    fn spawn_ticker(
        &self,
        entry: Arc<MonitorEntry>,
        generation: u64,
        refreshed_tx: oneshot::Sender<()>,
    ) -> Ticker {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let engine = self.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            debug!(monitor_id = %entry.id, generation, "Started ticker task.");
            if entry.is_current(generation) {
                if let Err(e) = engine.refresh(&entry).await {
                    warn!(monitor_id = %entry.id, error = %e, "Initial card refresh failed.");
                }
            }
            let _ = refreshed_tx.send(());

            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        debug!(monitor_id = %entry.id, "Ticker task received shutdown signal.");
                        break;
                    }
                    _ = interval.tick() => {
                        if !entry.is_current(generation) {
                            break;
                        }
                        match engine.refresh(&entry).await {
                            Ok(()) => {}
                            Err(e) if e.is_permanent() => {
                                error!(monitor_id = %entry.id, error = %e, "Status card is gone. Stopping monitor.");
                                engine.demote(&entry, generation).await;
                                break;
                            }
                            Err(e) => {
                                warn!(monitor_id = %entry.id, error = %e, "Card refresh failed; retrying on the next tick.");
                            }
                        }
                    }
                }
            }
            debug!(monitor_id = %entry.id, "Ticker task finished.");
        });

        Ticker {
            handle,
            shutdown_tx,
        }
    }
}
