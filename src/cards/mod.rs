use async_trait::async_trait;
use thiserror::Error;

pub mod discord;
pub mod models;

pub use discord::DiscordCardSender;
pub use models::{CardId, CardLocation, CardUpdate, Controls};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Card platform returned non-success status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid attachment {filename}: {source}")]
    InvalidAttachment {
        filename: &'static str,
        source: reqwest::Error,
    },
}

impl DeliveryError {
    /// The card or its channel is gone, or the bot lost access to it.
    /// Everything else (rate limits, server errors, timeouts) may succeed
    /// on a later attempt.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Rejected { status: 403 | 404, .. })
    }
}

/// The chat platform side of a monitor: posting and editing one status card.
///
/// All concrete bindings (and the test fakes) implement this trait.
#[async_trait]
pub trait CardSender: Send + Sync {
    /// Posts a new card in `channel_id` and returns where it landed.
    async fn publish(
        &self,
        channel_id: &str,
        update: &CardUpdate,
    ) -> Result<CardLocation, DeliveryError>;

    /// Replaces the card's content, attachments and controls.
    async fn update(&self, location: &CardLocation, update: &CardUpdate)
        -> Result<(), DeliveryError>;

    /// Changes only the card's controls.
    async fn set_controls(
        &self,
        location: &CardLocation,
        controls: &Controls,
    ) -> Result<(), DeliveryError>;

    /// Whether the card still exists.
    async fn resolve(&self, location: &CardLocation) -> Result<bool, DeliveryError>;
}
