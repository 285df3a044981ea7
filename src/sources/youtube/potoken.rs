use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::clients::ClientKind;

/// Tokens an external attestation service minted for one profile fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoTokenResult {
    /// Visitor data the tokens are bound to; replaces the session value.
    pub visitor_data: String,
    /// Sent as `serviceIntegrityDimensions.poToken` in the player body.
    pub player_request_token: String,
    /// Appended to stream URLs as `pot=`.
    pub streaming_data_token: Option<String>,
}

/// Source of proof-of-origin tokens. Returning `None` is always acceptable;
/// extraction carries on without them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PoTokenProvider: Send + Sync {
    async fn token_for(&self, client: ClientKind, video_id: &str) -> Option<PoTokenResult>;
}

/// Provider that never has a token.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPoTokenProvider;

#[async_trait]
impl PoTokenProvider for NoPoTokenProvider {
    async fn token_for(&self, _client: ClientKind, _video_id: &str) -> Option<PoTokenResult> {
        None
    }
}
