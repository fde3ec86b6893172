use serde::{Deserialize, Serialize};

use crate::monitor::token::encode_resume_control;
use crate::render::PresentationPayload;

/// Identity of a published card. Assigned by the platform when the card is
/// first posted; it doubles as the persistence key.
pub type CardId = String;

/// Everything the platform needs to find a card again after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardLocation {
    pub channel_id: String,
    pub message_id: CardId,
}

/// Button state attached to a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    pub resume_id: String,
    pub stop_enabled: bool,
    pub resume_enabled: bool,
}

impl Controls {
    /// While polling: stop is available, resume is not.
    pub fn active(target: &str) -> Self {
        Self {
            resume_id: encode_resume_control(target),
            stop_enabled: true,
            resume_enabled: false,
        }
    }

    /// After a stop: only resume is available.
    pub fn stopped(target: &str) -> Self {
        Self {
            resume_id: encode_resume_control(target),
            stop_enabled: false,
            resume_enabled: true,
        }
    }
}

/// A full card refresh: rendered content plus button state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUpdate {
    pub payload: PresentationPayload,
    pub controls: Controls,
}
