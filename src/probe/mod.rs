//! Status probing.
//!
//! A [`ProbeChain`] walks an ordered list of [`ProbeStrategy`] backends until
//! one of them gives a definitive answer. Failures never escape the chain: a
//! backend that cannot answer reports [`ProbeOutcome::Fallthrough`], and a
//! chain that runs out of backends reports the target as offline.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::time::Duration;
use tracing::debug;

use crate::config::MonitorConfig;

pub mod local;
pub mod remote;

pub use local::LocalHelperProbe;
pub use remote::RemoteApiProbe;

/// Normalised result of one status probe.
///
/// `players`, `max_players`, `motd` and `icon` carry data only when `online`
/// is true; an offline snapshot always has them zeroed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub online: bool,
    pub players: u32,
    pub max_players: u32,
    pub motd: String,
    pub icon: Option<Vec<u8>>,
}

impl StatusSnapshot {
    pub fn offline() -> Self {
        Self::default()
    }
}

/// What a single backend has to say about a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The backend answered; stop walking the chain.
    Definitive(StatusSnapshot),
    /// The backend could not answer; the reason is only logged.
    Fallthrough(String),
}

/// One backend in the probe chain.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn probe(&self, target: &str) -> ProbeOutcome;
}

/// Anything that can turn a target into a snapshot without failing.
///
/// The lifecycle engine depends on this rather than on [`ProbeChain`] so that
/// tests can script probe results and latencies.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self, target: &str) -> StatusSnapshot;
}

pub struct ProbeChain {
    strategies: Vec<Box<dyn ProbeStrategy>>,
}

impl ProbeChain {
    pub fn new(strategies: Vec<Box<dyn ProbeStrategy>>) -> Self {
        Self { strategies }
    }

    /// The production chain: local helper process first, public status API second.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, reqwest::Error> {
        let local = LocalHelperProbe::new(
            config.probe_helper_programs.clone(),
            config.probe_helper_script.clone().map(Into::into),
            Duration::from_secs(config.probe_helper_timeout_seconds.max(1)),
        );
        let remote = RemoteApiProbe::new(
            config.status_api_url.clone(),
            Duration::from_secs(config.status_api_timeout_seconds.max(1)),
        )?;
        Ok(Self::new(vec![Box::new(local), Box::new(remote)]))
    }
}

#[async_trait]
impl StatusProbe for ProbeChain {
    async fn probe(&self, target: &str) -> StatusSnapshot {
        for strategy in &self.strategies {
            match strategy.probe(target).await {
                ProbeOutcome::Definitive(snapshot) => return snapshot,
                ProbeOutcome::Fallthrough(reason) => {
                    debug!(
                        address = %target,
                        strategy = strategy.name(),
                        reason = %reason,
                        "Probe strategy had no answer, trying the next one."
                    );
                }
            }
        }
        StatusSnapshot::offline()
    }
}

/// Decodes a `data:image/...;base64,<payload>` URL (or a bare base64 payload)
/// into raw image bytes.
pub(crate) fn decode_icon(data: &str) -> Option<Vec<u8>> {
    let encoded = data.split_once(',').map_or(data, |(_, payload)| payload);
    match STANDARD.decode(encoded.trim()) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        _ => None,
    }
}
