//! Public status API fallback (mcsrvstat.us v2 response shape).
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{decode_icon, ProbeOutcome, ProbeStrategy, StatusSnapshot};

pub struct RemoteApiProbe {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    online: bool,
    players: Option<ApiPlayers>,
    motd: Option<ApiMotd>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPlayers {
    online: Option<u32>,
    max: Option<u32>,
    #[serde(default)]
    list: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiMotd {
    clean: Option<MotdLines>,
    raw: Option<MotdLines>,
}

/// MOTD fields show up either pre-joined or as one entry per line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MotdLines {
    Joined(String),
    Lines(Vec<String>),
}

impl MotdLines {
    fn join(&self) -> String {
        match self {
            MotdLines::Joined(text) => text.clone(),
            MotdLines::Lines(lines) => lines.join("\n"),
        }
    }
}

impl ApiStatus {
    fn into_snapshot(self) -> StatusSnapshot {
        if !self.online {
            return StatusSnapshot::offline();
        }

        let (players, max_players) = match &self.players {
            Some(p) => (
                p.online.unwrap_or(p.list.len() as u32),
                p.max.unwrap_or(0),
            ),
            None => (0, 0),
        };

        let motd = self
            .motd
            .as_ref()
            .and_then(|m| {
                [&m.clean, &m.raw]
                    .into_iter()
                    .flatten()
                    .map(MotdLines::join)
                    .find(|text| !text.is_empty())
            })
            .unwrap_or_default();

        StatusSnapshot {
            online: true,
            players,
            max_players,
            motd,
            icon: self.icon.as_deref().and_then(decode_icon),
        }
    }
}

impl RemoteApiProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn status_url(&self, target: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(target)
        )
    }

    async fn fetch(&self, target: &str) -> Result<ApiStatus, reqwest::Error> {
        self.client
            .get(self.status_url(target))
            .send()
            .await?
            .error_for_status()?
            .json::<ApiStatus>()
            .await
    }
}

#[async_trait]
impl ProbeStrategy for RemoteApiProbe {
    fn name(&self) -> &'static str {
        "status-api"
    }

    /// Always definitive: every transport or payload problem reads as offline.
    async fn probe(&self, target: &str) -> ProbeOutcome {
        match self.fetch(target).await {
            Ok(status) => ProbeOutcome::Definitive(status.into_snapshot()),
            Err(e) => {
                debug!(address = %target, error = %e, "Status API request failed, reporting offline.");
                ProbeOutcome::Definitive(StatusSnapshot::offline())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    /// Serves `router` on an ephemeral local port and returns its base URL.
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn fake_status(Path(target): Path<String>) -> Result<Json<Value>, StatusCode> {
        match target.as_str() {
            "play.example.org:25566" => Ok(Json(json!({
                "online": true,
                "hostname": "play.example.org",
                "players": { "online": 12, "max": 100 },
                "motd": { "raw": ["§aHello", "§cWorld"], "clean": ["Hello", "World"] },
                "icon": "data:image/png;base64,aGVsbG8="
            }))),
            "listed.example.org" => Ok(Json(json!({
                "online": true,
                "players": { "max": 10, "list": [{"name": "a"}, {"name": "b"}] },
                "motd": { "raw": "§eJoined already" }
            }))),
            "down.example.org" => Ok(Json(json!({ "online": false, "motd": { "clean": ["stale"] } }))),
            _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub(crate) fn fake_status_router() -> Router {
        Router::new().route("/2/{target}", get(fake_status))
    }

    async fn probe_against_fake(target: &str) -> ProbeOutcome {
        let base = serve(fake_status_router()).await;
        let probe = RemoteApiProbe::new(format!("{base}/2/"), Duration::from_secs(5)).unwrap();
        probe.probe(target).await
    }

    #[test]
    fn test_status_url_encodes_target_as_one_segment() {
        let probe =
            RemoteApiProbe::new("https://api.mcsrvstat.us/2/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            probe.status_url("play.example.org:25565"),
            "https://api.mcsrvstat.us/2/play.example.org%3A25565"
        );
        assert_eq!(
            probe.status_url("play.example.org"),
            "https://api.mcsrvstat.us/2/play.example.org"
        );
    }

    #[tokio::test]
    async fn test_online_payload_is_normalised() {
        let outcome = probe_against_fake("play.example.org:25566").await;
        assert_eq!(
            outcome,
            ProbeOutcome::Definitive(StatusSnapshot {
                online: true,
                players: 12,
                max_players: 100,
                motd: "Hello\nWorld".to_string(),
                icon: Some(b"hello".to_vec()),
            })
        );
    }

    #[tokio::test]
    async fn test_player_list_and_joined_raw_motd() {
        let ProbeOutcome::Definitive(snapshot) = probe_against_fake("listed.example.org").await
        else {
            panic!("remote probe must always be definitive");
        };
        assert!(snapshot.online);
        assert_eq!(snapshot.players, 2);
        assert_eq!(snapshot.max_players, 10);
        assert_eq!(snapshot.motd, "§eJoined already");
        assert_eq!(snapshot.icon, None);
    }

    #[tokio::test]
    async fn test_offline_payload_discards_data() {
        assert_eq!(
            probe_against_fake("down.example.org").await,
            ProbeOutcome::Definitive(StatusSnapshot::offline())
        );
    }

    #[tokio::test]
    async fn test_error_status_reads_as_offline() {
        assert_eq!(
            probe_against_fake("broken.example.org").await,
            ProbeOutcome::Definitive(StatusSnapshot::offline())
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_reads_as_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe =
            RemoteApiProbe::new(format!("http://{addr}/2"), Duration::from_secs(2)).unwrap();
        assert_eq!(
            probe.probe("mc.example.org").await,
            ProbeOutcome::Definitive(StatusSnapshot::offline())
        );
    }
}
