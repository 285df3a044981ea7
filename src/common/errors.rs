use serde::Serialize;
use thiserror::Error;

/// Why a piece of content is locked behind a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PaidReason {
    Payment,
    MembersOnly,
    MusicPremium,
}

/// Category of an [`ExtractionError`], for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    MalformedUpstreamData,
    ContentUnavailable,
    AgeRestricted,
    GeoRestricted,
    PrivateContent,
    PaidOrMembersOnly,
    RateLimited,
    DeobfuscationFailed,
    ResponseIdentityMismatch,
    Transport,
    UnsupportedUrl,
}

#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("malformed upstream data: {0}")]
    MalformedUpstreamData(String),
    #[error("content unavailable: {0}")]
    ContentUnavailable(String),
    #[error("age-restricted: {0}")]
    AgeRestricted(String),
    #[error("not available in this region: {0}")]
    GeoRestricted(String),
    #[error("private content: {0}")]
    PrivateContent(String),
    #[error("paid or members-only content ({reason:?}): {message}")]
    PaidOrMembersOnly { reason: PaidReason, message: String },
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("deobfuscation failed: {0}")]
    DeobfuscationFailed(String),
    #[error("response was for video {returned:?}, requested {requested}")]
    ResponseIdentityMismatch {
        requested: String,
        returned: Option<String>,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),
}

pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedUpstreamData(_) => ErrorKind::MalformedUpstreamData,
            Self::ContentUnavailable(_) => ErrorKind::ContentUnavailable,
            Self::AgeRestricted(_) => ErrorKind::AgeRestricted,
            Self::GeoRestricted(_) => ErrorKind::GeoRestricted,
            Self::PrivateContent(_) => ErrorKind::PrivateContent,
            Self::PaidOrMembersOnly { .. } => ErrorKind::PaidOrMembersOnly,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::DeobfuscationFailed(_) => ErrorKind::DeobfuscationFailed,
            Self::ResponseIdentityMismatch { .. } => ErrorKind::ResponseIdentityMismatch,
            Self::Transport(_) => ErrorKind::Transport,
            Self::UnsupportedUrl(_) => ErrorKind::UnsupportedUrl,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedUpstreamData(message.into())
    }

    pub fn deobfuscation(message: impl Into<String>) -> Self {
        Self::DeobfuscationFailed(message.into())
    }

    /// Denials that come from the backend's playability verdict rather than from
    /// us failing to talk to it.
    pub fn is_playability_denial(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ContentUnavailable
                | ErrorKind::AgeRestricted
                | ErrorKind::GeoRestricted
                | ErrorKind::PrivateContent
                | ErrorKind::PaidOrMembersOnly
        )
    }
}

impl From<serde_json::Error> for ExtractionError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedUpstreamData(format!("invalid json: {e}"))
    }
}

impl From<regex::Error> for ExtractionError {
    fn from(e: regex::Error) -> Self {
        Self::MalformedUpstreamData(format!("bad pattern: {e}"))
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().map(|s| s.as_u16()) == Some(429) {
            return Self::RateLimited(e.to_string());
        }
        Self::Transport(e.to_string())
    }
}

/// Error body printed by the CLI when extraction fails.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    pub kind: ErrorKind,
    pub message: String,
    pub input: String,
}

impl ErrorReport {
    pub fn new(error: &ExtractionError, input: impl Into<String>) -> Self {
        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            kind: error.kind(),
            message: error.to_string(),
            input: input.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_variant() {
        let paid = ExtractionError::PaidOrMembersOnly {
            reason: PaidReason::MembersOnly,
            message: "members".into(),
        };
        assert_eq!(paid.kind(), ErrorKind::PaidOrMembersOnly);
        assert!(paid.is_playability_denial());

        let mismatch = ExtractionError::ResponseIdentityMismatch {
            requested: "aaaaaaaaaaa".into(),
            returned: Some("bbbbbbbbbbb".into()),
        };
        assert_eq!(mismatch.kind(), ErrorKind::ResponseIdentityMismatch);
        assert!(!mismatch.is_playability_denial());
    }

    #[test]
    fn json_errors_are_malformed_data() {
        let err: ExtractionError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::MalformedUpstreamData);
    }
}
