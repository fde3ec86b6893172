use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response, StatusCode};
use rust_i18n::t;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{CardLocation, CardSender, CardUpdate, Controls, DeliveryError};
use crate::monitor::token::STOP_CONTROL_ID;
use crate::render::PresentationPayload;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_SUCCESS: u8 = 3;
const BUTTON_STYLE_DANGER: u8 = 4;

/// A card binding over the Discord REST API: cards are bot messages with one
/// embed, up to two attachments and a row of two buttons.
pub struct DiscordCardSender {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct CreatedMessage {
    id: String,
}

impl DiscordCardSender {
    /// Every request, including body transfer, is bounded by `timeout`.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn channel_messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_url)
    }

    fn message_url(&self, location: &CardLocation) -> String {
        format!(
            "{}/{}",
            self.channel_messages_url(&location.channel_id),
            location.message_id
        )
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn check(response: Response) -> Result<Response, DeliveryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn components_json(controls: &Controls) -> Value {
    json!([{
        "type": COMPONENT_ACTION_ROW,
        "components": [
            {
                "type": COMPONENT_BUTTON,
                "style": BUTTON_STYLE_DANGER,
                "label": t!("controls.stop"),
                "custom_id": STOP_CONTROL_ID,
                "disabled": !controls.stop_enabled,
            },
            {
                "type": COMPONENT_BUTTON,
                "style": BUTTON_STYLE_SUCCESS,
                "label": t!("controls.resume"),
                "custom_id": controls.resume_id,
                "disabled": !controls.resume_enabled,
            }
        ]
    }])
}

fn embed_json(payload: &PresentationPayload) -> Value {
    let fields: Vec<Value> = payload
        .fields
        .iter()
        .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
        .collect();

    let mut embed = json!({
        "title": payload.title,
        "color": payload.color(),
        "fields": fields,
        "timestamp": Utc::now().to_rfc3339(),
    });
    if let Some(thumbnail) = &payload.thumbnail {
        embed["thumbnail"] = json!({ "url": format!("attachment://{}", thumbnail.filename) });
    }
    if let Some(image) = &payload.motd_image {
        embed["image"] = json!({ "url": format!("attachment://{}", image.filename) });
    }
    embed
}

/// Message body for a full refresh. Listing the new attachments makes an
/// edit drop the files from the previous refresh.
fn message_json(update: &CardUpdate) -> Value {
    let attachments: Vec<Value> = update
        .payload
        .attachments()
        .enumerate()
        .map(|(id, a)| json!({ "id": id, "filename": a.filename }))
        .collect();

    json!({
        "embeds": [embed_json(&update.payload)],
        "components": components_json(&update.controls),
        "attachments": attachments,
    })
}

fn message_form(update: &CardUpdate) -> Result<Form, DeliveryError> {
    let mut form = Form::new().text("payload_json", serde_json::to_string(&message_json(update))?);
    for (index, attachment) in update.payload.attachments().enumerate() {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.filename)
            .mime_str(attachment.content_type)
            .map_err(|source| DeliveryError::InvalidAttachment {
                filename: attachment.filename,
                source,
            })?;
        form = form.part(format!("files[{index}]"), part);
    }
    Ok(form)
}

#[async_trait]
impl CardSender for DiscordCardSender {
    async fn publish(
        &self,
        channel_id: &str,
        update: &CardUpdate,
    ) -> Result<CardLocation, DeliveryError> {
        let response = self
            .client
            .post(self.channel_messages_url(channel_id))
            .header(header::AUTHORIZATION, self.authorization())
            .multipart(message_form(update)?)
            .send()
            .await?;
        let created: CreatedMessage = Self::check(response).await?.json().await?;
        Ok(CardLocation {
            channel_id: channel_id.to_string(),
            message_id: created.id,
        })
    }

    async fn update(
        &self,
        location: &CardLocation,
        update: &CardUpdate,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .patch(self.message_url(location))
            .header(header::AUTHORIZATION, self.authorization())
            .multipart(message_form(update)?)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_controls(
        &self,
        location: &CardLocation,
        controls: &Controls,
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .patch(self.message_url(location))
            .header(header::AUTHORIZATION, self.authorization())
            .json(&json!({ "components": components_json(controls) }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn resolve(&self, location: &CardLocation) -> Result<bool, DeliveryError> {
        let response = self
            .client
            .get(self.message_url(location))
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            return Ok(false);
        }
        Self::check(response).await?;
        Ok(true)
    }
}
