//! Platform-neutral command handling: who may do what, and what to say back.
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::lifecycle::{LifecycleEngine, ResumeOutcome, StopOutcome};
use super::token::{is_resume_control, STOP_CONTROL_ID};
use crate::cards::CardLocation;

/// The user behind a command. `privileged` is decided by the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub privileged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

#[derive(Clone)]
pub struct CommandHandler {
    engine: LifecycleEngine,
}

impl CommandHandler {
    pub fn new(engine: LifecycleEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// The `monitor <target>` command: publish a card in `channel_id` and
    /// start polling.
    pub async fn monitor(&self, actor: &Actor, target: &str, channel_id: &str) -> Reply {
        if !actor.privileged {
            return Reply::private(t!("reply.monitor_denied"));
        }
        let target = target.trim();
        if target.is_empty() {
            return Reply::private(t!("reply.empty_target"));
        }

        match self.engine.start_monitor(target, &actor.id, channel_id).await {
            Ok(_) => Reply::private(t!("reply.started", target = target)),
            Err(e) => {
                warn!(address = %target, error = %e, "Failed to start monitor.");
                Reply::private(t!("reply.start_failed", error = e.to_string()))
            }
        }
    }

    /// A button press on `card`.
    pub async fn control(&self, actor: &Actor, control_id: &str, card: &CardLocation) -> Reply {
        if control_id == STOP_CONTROL_ID {
            if !actor.privileged {
                return Reply::private(t!("reply.stop_denied"));
            }
            return match self.engine.stop(&card.message_id).await {
                StopOutcome::Stopped { target } => {
                    info!(actor = %actor.id, monitor_id = %card.message_id, "Stop requested.");
                    Reply::private(t!("reply.stopped", target = target))
                }
                StopOutcome::AlreadyStopped { target } => {
                    Reply::private(t!("reply.already_stopped", target = target))
                }
                StopOutcome::NotFound => Reply::private(t!("reply.not_found")),
            };
        }

        if is_resume_control(control_id) {
            if !actor.privileged {
                return Reply::private(t!("reply.resume_denied"));
            }
            return match self.engine.resume(card, control_id, &actor.id).await {
                ResumeOutcome::Resumed { target, .. } => {
                    info!(actor = %actor.id, monitor_id = %card.message_id, "Resume requested.");
                    Reply::private(t!("reply.resumed", target = target))
                }
                ResumeOutcome::AlreadyActive { .. } => Reply::private(t!("reply.already_active")),
                ResumeOutcome::NotFound => Reply::private(t!("reply.not_found")),
            };
        }

        Reply::private(t!("reply.unknown_control"))
    }
}
