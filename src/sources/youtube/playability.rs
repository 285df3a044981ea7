//! Turns the backend's `playabilityStatus` verdict into a typed error.
//!
//! The backend only gives us English prose, so classification is substring
//! matching on `reason`; new wording needs new matchers here.

use serde_json::Value;

use super::utils::{get_array, get_str, text_of};
use crate::common::errors::{ExtractionError, ExtractionResult, PaidReason};

fn status(player_response: &Value) -> Option<&str> {
    player_response
        .pointer("/playabilityStatus/status")
        .and_then(Value::as_str)
}

fn reason(player_response: &Value) -> Option<&str> {
    player_response
        .pointer("/playabilityStatus/reason")
        .and_then(Value::as_str)
}

/// A `LOGIN_REQUIRED` verdict whose reason mentions age: the embedded client
/// can usually still play it.
pub fn is_age_restricted(player_response: &Value) -> bool {
    status(player_response).is_some_and(|s| s.eq_ignore_ascii_case("LOGIN_REQUIRED"))
        && reason(player_response).is_some_and(|r| r.to_lowercase().contains("age"))
}

fn error_screen_subreason(player_response: &Value) -> Option<String> {
    player_response
        .pointer("/playabilityStatus/errorScreen/playerErrorMessageRenderer/subreason")
        .and_then(text_of)
        .filter(|s| !s.is_empty())
}

fn paid(reason: PaidReason, message: &str) -> ExtractionError {
    ExtractionError::PaidOrMembersOnly {
        reason,
        message: message.to_string(),
    }
}

/// `Ok(())` when the response may carry streams; otherwise the most specific
/// denial we can infer.
pub fn check_playability(player_response: &Value) -> ExtractionResult<()> {
    let playability = match player_response.get("playabilityStatus") {
        Some(p) => p,
        None => return Ok(()),
    };
    let status = get_str(playability, "status").unwrap_or("OK");
    if status.eq_ignore_ascii_case("OK") {
        return Ok(());
    }
    let reason = get_str(playability, "reason");

    if status.eq_ignore_ascii_case("LOGIN_REQUIRED") {
        match reason {
            None => {
                let message = get_array(playability, "messages")
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if message.to_lowercase().contains("private") {
                    return Err(ExtractionError::PrivateContent(message.to_string()));
                }
            }
            Some(r) if r.to_lowercase().contains("age") => {
                return Err(ExtractionError::AgeRestricted(r.to_string()));
            }
            Some(_) => {}
        }
    }

    if status.eq_ignore_ascii_case("UNPLAYABLE") || status.eq_ignore_ascii_case("ERROR") {
        if let Some(r) = reason {
            let lowered = r.to_lowercase();
            if lowered.contains("music premium") {
                return Err(paid(PaidReason::MusicPremium, r));
            }
            if lowered.contains("payment") {
                return Err(paid(PaidReason::Payment, r));
            }
            if lowered.contains("members-only") {
                return Err(paid(PaidReason::MembersOnly, r));
            }
            if lowered.contains("unavailable") {
                let detail = error_screen_subreason(player_response);
                return Err(match detail {
                    Some(d) if d.to_lowercase().contains("country") => {
                        ExtractionError::GeoRestricted(d)
                    }
                    Some(d) => ExtractionError::ContentUnavailable(d),
                    None => ExtractionError::ContentUnavailable(r.to_string()),
                });
            }
            if lowered.contains("age-restricted") {
                return Err(ExtractionError::AgeRestricted(r.to_string()));
            }
        }
    }

    Err(ExtractionError::ContentUnavailable(format!(
        "Got error status {}: {}",
        status,
        reason.unwrap_or("no reason given")
    )))
}
