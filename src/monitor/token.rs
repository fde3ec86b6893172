//! Control identifiers carried by a card's buttons.
//!
//! The resume control embeds the monitored target, so a card can be brought
//! back to life by a process that has never seen it before:
//! `restart_monitor:<base64(target)>`.
use base64::{engine::general_purpose::STANDARD, Engine};

pub const STOP_CONTROL_ID: &str = "stop_monitor";
pub const RESUME_CONTROL_PREFIX: &str = "restart_monitor";

/// Platform limit on the length of a control identifier.
pub const MAX_CONTROL_ID_LEN: usize = 100;

/// Builds the resume control id for `target`.
///
/// Targets too long to fit the platform limit get the bare prefix, which
/// [`decode_resume_control`] rejects.
pub fn encode_resume_control(target: &str) -> String {
    let id = format!("{RESUME_CONTROL_PREFIX}:{}", STANDARD.encode(target.as_bytes()));
    if id.len() > MAX_CONTROL_ID_LEN {
        return RESUME_CONTROL_PREFIX.to_string();
    }
    id
}

/// Recovers the target from a resume control id, or `None` if the id is not
/// a well-formed resume control.
pub fn decode_resume_control(control_id: &str) -> Option<String> {
    let payload = control_id
        .strip_prefix(RESUME_CONTROL_PREFIX)?
        .strip_prefix(':')?;
    let bytes = STANDARD.decode(payload).ok()?;
    let target = String::from_utf8(bytes).ok()?;
    (!target.is_empty()).then_some(target)
}

pub fn is_resume_control(control_id: &str) -> bool {
    control_id == RESUME_CONTROL_PREFIX
        || control_id.starts_with(&format!("{RESUME_CONTROL_PREFIX}:"))
}
