//! Turns a [`StatusSnapshot`] into the presentation shown on a card.
//!
//! Nothing here knows how cards are delivered; the card binding decides how
//! fields, colors and attachments map onto its own message format.
use rust_i18n::t;

use crate::probe::StatusSnapshot;

pub mod motd;

pub const ICON_FILENAME: &str = "servericon.png";
pub const MOTD_FILENAME: &str = "motd.svg";

const MAINTENANCE_KEYWORDS: [&str; 2] = ["maintenance", "manutenzione"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Online,
    Maintenance,
    Offline,
    /// Default grey; no snapshot classifies to it.
    Unknown,
}

impl StatusCategory {
    pub fn color(self) -> u32 {
        match self {
            StatusCategory::Online => 0x22c55e,
            StatusCategory::Maintenance => 0x55b4ff,
            StatusCategory::Offline => 0xff4d4f,
            StatusCategory::Unknown => 0x999999,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationPayload {
    pub title: String,
    pub status_text: String,
    pub category: StatusCategory,
    pub fields: Vec<CardField>,
    pub thumbnail: Option<Attachment>,
    pub motd_image: Option<Attachment>,
}

impl PresentationPayload {
    pub fn color(&self) -> u32 {
        self.category.color()
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.thumbnail.iter().chain(self.motd_image.iter())
    }
}

pub fn classify(snapshot: &StatusSnapshot) -> StatusCategory {
    if !snapshot.online {
        return StatusCategory::Offline;
    }
    let motd = snapshot.motd.to_lowercase();
    if MAINTENANCE_KEYWORDS.iter().any(|keyword| motd.contains(keyword)) {
        StatusCategory::Maintenance
    } else {
        StatusCategory::Online
    }
}

pub fn render(target: &str, snapshot: &StatusSnapshot) -> PresentationPayload {
    let category = classify(snapshot);
    let status_text = match category {
        StatusCategory::Online => t!("status.online"),
        StatusCategory::Maintenance => t!("status.maintenance"),
        StatusCategory::Offline => t!("status.offline"),
        StatusCategory::Unknown => t!("status.unknown"),
    }
    .to_string();

    let players = if snapshot.online {
        format!("{}/{}", snapshot.players, snapshot.max_players)
    } else {
        t!("card.not_available").to_string()
    };

    let fields = vec![
        CardField {
            name: t!("card.field_address").to_string(),
            value: format!("```\n{target}\n```"),
            inline: true,
        },
        CardField {
            name: t!("card.field_players").to_string(),
            value: players,
            inline: true,
        },
        CardField {
            name: t!("card.field_state").to_string(),
            value: status_text.clone(),
            inline: false,
        },
    ];

    // Offline snapshots carry no meaningful icon or MOTD.
    let thumbnail = snapshot
        .icon
        .as_ref()
        .filter(|_| snapshot.online)
        .map(|bytes| Attachment {
            filename: ICON_FILENAME,
            content_type: "image/png",
            bytes: bytes.clone(),
        });
    let motd_image = (snapshot.online && !snapshot.motd.is_empty()).then(|| Attachment {
        filename: MOTD_FILENAME,
        content_type: "image/svg+xml",
        bytes: motd::render_motd_svg(&snapshot.motd),
    });

    PresentationPayload {
        title: t!("card.title").to_string(),
        status_text,
        category,
        fields,
        thumbnail,
        motd_image,
    }
}
