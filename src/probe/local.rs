//! Local status helper: a short-lived external process that queries the
//! server directly and prints a single JSON object on stdout.
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{decode_icon, ProbeOutcome, ProbeStrategy, StatusSnapshot};

/// Runs `<program> [script] <target>` for each configured program in turn.
pub struct LocalHelperProbe {
    programs: Vec<String>,
    script: Option<PathBuf>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelperReport {
    online: Option<bool>,
    players: Option<u32>,
    max_players: Option<u32>,
    motd: Option<String>,
    favicon: Option<String>,
    error: Option<String>,
}

impl HelperReport {
    fn into_snapshot(self) -> StatusSnapshot {
        StatusSnapshot {
            online: true,
            players: self.players.unwrap_or(0),
            max_players: self.max_players.unwrap_or(0),
            motd: self.motd.unwrap_or_default(),
            icon: self.favicon.as_deref().and_then(decode_icon),
        }
    }
}

impl LocalHelperProbe {
    pub fn new(programs: Vec<String>, script: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            programs,
            script,
            timeout,
        }
    }

    async fn run_program(&self, program: &str, target: &str) -> Result<HelperReport, String> {
        let mut command = Command::new(program);
        if let Some(script) = &self.script {
            command.arg(script);
        }
        command
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("failed to spawn: {e}")),
            Err(_) => return Err(format!("timed out after {:?}", self.timeout)),
        };

        if !output.status.success() {
            return Err(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| format!("unparseable output: {e}"))
    }
}

#[async_trait]
impl ProbeStrategy for LocalHelperProbe {
    fn name(&self) -> &'static str {
        "local-helper"
    }

    async fn probe(&self, target: &str) -> ProbeOutcome {
        let mut last_failure = "no helper programs configured".to_string();

        for program in &self.programs {
            let report = match self.run_program(program, target).await {
                Ok(report) => report,
                Err(reason) => {
                    debug!(program = %program, reason = %reason, "Status helper run failed.");
                    last_failure = format!("{program}: {reason}");
                    continue;
                }
            };

            if let Some(error) = report.error {
                last_failure = format!("{program}: helper reported {error}");
                continue;
            }

            match report.online {
                Some(false) => return ProbeOutcome::Definitive(StatusSnapshot::offline()),
                Some(true) => return ProbeOutcome::Definitive(report.into_snapshot()),
                None => last_failure = format!("{program}: report has no online flag"),
            }
        }

        ProbeOutcome::Fallthrough(last_failure)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Writes a shell script that ignores its argument and prints `body`.
    fn helper_script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("helper.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn sh_probe(script: PathBuf, timeout: Duration) -> LocalHelperProbe {
        LocalHelperProbe::new(vec!["/bin/sh".to_string()], Some(script), timeout)
    }

    #[tokio::test]
    async fn test_online_report_is_normalised() {
        let dir = TempDir::new().unwrap();
        let script = helper_script(
            &dir,
            r#"printf '%s' '{"online": true, "players": 7, "maxPlayers": 50, "motd": "§aWelcome", "favicon": "data:image/png;base64,aGVsbG8=", "version": "1.21"}'"#,
        );
        let probe = sh_probe(script, Duration::from_secs(5));

        let outcome = probe.probe("mc.example.org").await;
        assert_eq!(
            outcome,
            ProbeOutcome::Definitive(StatusSnapshot {
                online: true,
                players: 7,
                max_players: 50,
                motd: "§aWelcome".to_string(),
                icon: Some(b"hello".to_vec()),
            })
        );
    }

    #[tokio::test]
    async fn test_offline_report_is_definitive() {
        let dir = TempDir::new().unwrap();
        let script = helper_script(&dir, r#"printf '%s' '{"online": false}'"#);
        let probe = sh_probe(script, Duration::from_secs(5));

        assert_eq!(
            probe.probe("mc.example.org").await,
            ProbeOutcome::Definitive(StatusSnapshot::offline())
        );
    }

    #[tokio::test]
    async fn test_error_report_falls_through() {
        let dir = TempDir::new().unwrap();
        let script = helper_script(
            &dir,
            r#"printf '%s' '{"online": false, "error": "no_mcstatus"}'"#,
        );
        let probe = sh_probe(script, Duration::from_secs(5));

        match probe.probe("mc.example.org").await {
            ProbeOutcome::Fallthrough(reason) => assert!(reason.contains("no_mcstatus")),
            other => panic!("expected fallthrough, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_output_falls_through() {
        let dir = TempDir::new().unwrap();
        let script = helper_script(&dir, "echo 'Traceback (most recent call last):'");
        let probe = sh_probe(script, Duration::from_secs(5));

        assert!(matches!(
            probe.probe("mc.example.org").await,
            ProbeOutcome::Fallthrough(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_program_tries_next_candidate() {
        let dir = TempDir::new().unwrap();
        let script = helper_script(&dir, r#"printf '%s' '{"online": false}'"#);
        let probe = LocalHelperProbe::new(
            vec![
                "/nonexistent/python3".to_string(),
                "/bin/sh".to_string(),
            ],
            Some(script),
            Duration::from_secs(5),
        );

        assert_eq!(
            probe.probe("mc.example.org").await,
            ProbeOutcome::Definitive(StatusSnapshot::offline())
        );
    }

    #[tokio::test]
    async fn test_hanging_helper_is_cut_off() {
        let dir = TempDir::new().unwrap();
        let script = helper_script(&dir, "sleep 30");
        let probe = sh_probe(script, Duration::from_millis(300));

        let started = Instant::now();
        let outcome = probe.probe("mc.example.org").await;
        assert!(matches!(outcome, ProbeOutcome::Fallthrough(ref r) if r.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_no_programs_falls_through() {
        let probe = LocalHelperProbe::new(Vec::new(), None, Duration::from_secs(1));
        assert!(matches!(
            probe.probe("mc.example.org").await,
            ProbeOutcome::Fallthrough(_)
        ));
    }
}
