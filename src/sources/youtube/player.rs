//! Drives the client profiles in order to get one trustworthy player response
//! plus every profile's streaming data.

use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};

use super::{
    cipher::CipherManager,
    clients::{
        ANDROID, ClientProfile, IOS, PlayerRequest, TV, VisitorDataCache, WEB, WEB_EMBEDDED,
        common::{execute_json, next_http_request, player_http_request, visitor_data_for},
    },
    playability::{check_playability, is_age_restricted},
    potoken::{PoTokenProvider, PoTokenResult},
    streams::StreamingDescriptor,
};
use crate::{
    common::{
        errors::{ExtractionError, ExtractionResult},
        types::SessionNonce,
    },
    transport::{Localization, Transport},
};

/// Everything the orchestrator gathered for one video.
#[derive(Debug, Clone)]
pub struct PlayerResponses {
    /// The accepted html5 response; source of metadata.
    pub primary: Value,
    /// The embedded client had to stand in for an age gate.
    pub age_gated: bool,
    /// Streaming data in profile priority order: html5, Android, iOS.
    pub descriptors: Vec<StreamingDescriptor>,
    pub next: Option<Value>,
}

pub fn returned_video_id(response: &Value) -> Option<&str> {
    response
        .pointer("/videoDetails/videoId")
        .and_then(Value::as_str)
}

/// The backend answers suspicious clients with an unrelated video; such a
/// response must not be used.
pub fn is_response_for(response: &Value, video_id: &str) -> bool {
    returned_video_id(response) == Some(video_id)
}

fn mismatch(video_id: &str, response: &Value) -> ExtractionError {
    ExtractionError::ResponseIdentityMismatch {
        requested: video_id.to_string(),
        returned: returned_video_id(response).map(str::to_string),
    }
}

fn descriptor_from(
    response: &Value,
    profile: &ClientProfile,
    cpn: SessionNonce,
    token: Option<&PoTokenResult>,
) -> Option<StreamingDescriptor> {
    let streaming_data = response.get("streamingData")?.clone();
    Some(StreamingDescriptor {
        client: profile.kind,
        streaming_data,
        cpn,
        streaming_token: token.and_then(|t| t.streaming_data_token.clone()),
    })
}

pub struct PlayerOrchestrator<'a> {
    pub transport: &'a dyn Transport,
    pub cipher: &'a CipherManager,
    pub visitor_data: &'a VisitorDataCache,
    pub po_tokens: &'a dyn PoTokenProvider,
    pub localization: &'a Localization,
    pub fetch_ios: bool,
}

impl PlayerOrchestrator<'_> {
    async fn fetch_player(
        &self,
        profile: &ClientProfile,
        video_id: &str,
        cpn: &SessionNonce,
        signature_timestamp: Option<u32>,
        visitor_data: Option<&str>,
        po_token: Option<&str>,
    ) -> ExtractionResult<Value> {
        let request = PlayerRequest {
            video_id,
            cpn,
            localization: self.localization,
            visitor_data,
            signature_timestamp,
            po_token,
        };
        debug!("{} player request for {}", profile.name, video_id);
        execute_json(self.transport, player_http_request(profile, &request))
            .instrument(info_span!("client", client = %profile.kind))
            .await
    }

    /// Fetches an html5 profile with the script version declared, which ciphered
    /// URLs require.
    async fn fetch_html5(
        &self,
        profile: &ClientProfile,
        video_id: &str,
    ) -> ExtractionResult<(Value, SessionNonce)> {
        let sts = self.cipher.signature_timestamp(video_id).await?;
        let cpn = SessionNonce::generate();
        let response = self
            .fetch_player(profile, video_id, &cpn, Some(sts), None, None)
            .await?;
        Ok((response, cpn))
    }

    /// Step 1: the desktop chain. Produces the accepted response and, when it
    /// carries usable streaming data, the html5 descriptor.
    async fn desktop_chain(
        &self,
        video_id: &str,
    ) -> ExtractionResult<(Value, bool, Option<StreamingDescriptor>)> {
        let token = self.po_tokens.token_for(WEB.kind, video_id).await;
        let web_cpn = SessionNonce::generate();
        let web = match &token {
            Some(t) => {
                let sts = self.cipher.signature_timestamp(video_id).await?;
                self.fetch_player(
                    &WEB,
                    video_id,
                    &web_cpn,
                    Some(sts),
                    Some(&t.visitor_data),
                    Some(&t.player_request_token),
                )
                .await?
            }
            None => {
                self.fetch_player(&WEB, video_id, &web_cpn, None, None, None)
                    .await?
            }
        };
        let web_valid = is_response_for(&web, video_id);

        if web_valid && is_age_restricted(&web) {
            debug!("{} is age restricted, trying the embedded client", video_id);
            let (embedded, cpn) = self.fetch_html5(&WEB_EMBEDDED, video_id).await?;
            if !is_response_for(&embedded, video_id) {
                check_playability(&web)?;
                return Err(mismatch(video_id, &embedded));
            }
            check_playability(&embedded)?;
            let descriptor = descriptor_from(&embedded, &WEB_EMBEDDED, cpn, None);
            return Ok((embedded, true, descriptor));
        }

        if web_valid {
            check_playability(&web)?;
            if let Some(t) = &token {
                if let Some(descriptor) = descriptor_from(&web, &WEB, web_cpn, Some(t)) {
                    return Ok((web, false, Some(descriptor)));
                }
            }
        } else {
            warn!(
                "{} answered for {:?} instead of {}, escalating",
                WEB.name,
                returned_video_id(&web),
                video_id
            );
        }

        match self.fetch_html5(&TV, video_id).await {
            Ok((tv, cpn)) if is_response_for(&tv, video_id) => {
                if web_valid {
                    let descriptor = descriptor_from(&tv, &TV, cpn, None);
                    Ok((web, false, descriptor))
                } else {
                    check_playability(&tv)?;
                    let descriptor = descriptor_from(&tv, &TV, cpn, None);
                    Ok((tv, false, descriptor))
                }
            }
            Ok((tv, _)) if web_valid => {
                warn!("{} response for {} not valid: {}", TV.name, video_id, mismatch(video_id, &tv));
                Ok((web, false, None))
            }
            Ok((tv, _)) => Err(mismatch(video_id, &tv)),
            Err(e) if web_valid => {
                warn!("{} request for {} failed: {}", TV.name, video_id, e);
                Ok((web, false, None))
            }
            Err(e) => Err(e),
        }
    }

    /// Steps 2 and 3: a mobile profile. Any failure only costs its streams.
    async fn mobile(&self, profile: &ClientProfile, video_id: &str) -> Option<StreamingDescriptor> {
        let attempt = async {
            let token = self.po_tokens.token_for(profile.kind, video_id).await;
            let visitor_data = match &token {
                Some(t) => Some(t.visitor_data.clone()),
                None if profile.needs_visitor_data => Some(
                    visitor_data_for(self.transport, self.visitor_data, profile, self.localization)
                        .await?,
                ),
                None => None,
            };
            let cpn = SessionNonce::generate();
            let response = self
                .fetch_player(
                    profile,
                    video_id,
                    &cpn,
                    None,
                    visitor_data.as_deref(),
                    token.as_ref().map(|t| t.player_request_token.as_str()),
                )
                .await?;
            if !is_response_for(&response, video_id) {
                return Err(mismatch(video_id, &response));
            }
            check_playability(&response)?;
            let descriptor = descriptor_from(&response, profile, cpn, token.as_ref())
                .ok_or_else(|| ExtractionError::malformed("no streamingData"))?;
            Ok::<_, ExtractionError>(descriptor)
        };

        match attempt.await {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("ignoring {} streams for {}: {}", profile.name, video_id, e);
                None
            }
        }
    }

    /// Step 4: supplementary metadata. Missing is acceptable.
    async fn next(&self, video_id: &str, primary: &Value) -> Option<Value> {
        let visitor_data = primary
            .pointer("/responseContext/visitorData")
            .and_then(Value::as_str);
        let request = next_http_request(&WEB, video_id, self.localization, visitor_data);
        match execute_json(self.transport, request).await {
            Ok(next) => Some(next),
            Err(e) => {
                warn!("next request for {} failed: {}", video_id, e);
                None
            }
        }
    }

    pub async fn fetch(&self, video_id: &str) -> ExtractionResult<PlayerResponses> {
        let (primary, age_gated, html5) = self.desktop_chain(video_id).await?;

        let ios = async {
            if self.fetch_ios {
                self.mobile(&IOS, video_id).await
            } else {
                None
            }
        };
        let (android, ios, next) = futures::join!(
            self.mobile(&ANDROID, video_id),
            ios,
            self.next(video_id, &primary)
        );

        let descriptors: Vec<_> = [html5, android, ios].into_iter().flatten().collect();
        debug!(
            "{} yielded streaming data from {:?}",
            video_id,
            descriptors.iter().map(|d| d.client).collect::<Vec<_>>()
        );

        Ok(PlayerResponses {
            primary,
            age_gated,
            descriptors,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::{
        sources::youtube::{
            cipher::TransformInterpreter, clients::ClientKind, potoken::MockPoTokenProvider,
        },
        transport::{HttpRequest, HttpResponse},
    };

    const VIDEO_ID: &str = "dQw4w9WgXcQ";
    const PLAYER: &str = r#"var foo=1;signatureTimestamp:19834,"#;

    /// Answers WEB with streaming data and every other profile with a 500,
    /// keeping the player bodies it saw.
    #[derive(Default)]
    struct WebOnly {
        bodies: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Transport for WebOnly {
        async fn execute(&self, request: HttpRequest) -> ExtractionResult<HttpResponse> {
            let body: Value = request
                .body
                .as_deref()
                .and_then(|b| serde_json::from_str(b).ok())
                .unwrap_or_default();
            let client = body
                .pointer("/context/client/clientName")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let reply = if request.url.contains("/youtubei/v1/next") {
                Some(json!({}))
            } else if request.url.contains("/youtubei/v1/visitor_id") {
                Some(json!({ "responseContext": { "visitorData": "CgtWSVNJVE9S" } }))
            } else if client == "WEB" {
                Some(json!({
                    "playabilityStatus": { "status": "OK" },
                    "videoDetails": { "videoId": VIDEO_ID },
                    "streamingData": { "adaptiveFormats": [] },
                }))
            } else {
                None
            };
            if request.url.contains("/youtubei/v1/player") {
                self.bodies.lock().push(body);
            }
            Ok(HttpResponse {
                status: if reply.is_some() { 200 } else { 500 },
                headers: Vec::new(),
                body: reply.map(|r| r.to_string()).unwrap_or_default(),
                final_url: request.url,
            })
        }
    }

    #[tokio::test]
    async fn web_token_goes_into_the_request_and_descriptor() {
        let transport = Arc::new(WebOnly::default());
        let cipher = CipherManager::new(
            transport.clone(),
            Arc::new(TransformInterpreter),
            Duration::from_secs(60),
        );
        cipher.install_script("https://www.youtube.com/s/player/abcdef12/base.js", PLAYER);

        let mut tokens = MockPoTokenProvider::new();
        tokens
            .expect_token_for()
            .withf(|client, video_id| *client == ClientKind::Web && video_id == VIDEO_ID)
            .times(1)
            .returning(|_, _| {
                Some(PoTokenResult {
                    visitor_data: "VD".into(),
                    player_request_token: "PRT".into(),
                    streaming_data_token: Some("SDT".into()),
                })
            });
        tokens
            .expect_token_for()
            .withf(|client, _| *client == ClientKind::Android)
            .times(1)
            .returning(|_, _| None);

        let visitor_data = VisitorDataCache::default();
        let localization = Localization::default();
        let orchestrator = PlayerOrchestrator {
            transport: transport.as_ref(),
            cipher: &cipher,
            visitor_data: &visitor_data,
            po_tokens: &tokens,
            localization: &localization,
            fetch_ios: false,
        };
        let responses = orchestrator.fetch(VIDEO_ID).await.unwrap();

        assert_eq!(responses.descriptors.len(), 1);
        assert_eq!(responses.descriptors[0].client, ClientKind::Web);
        assert_eq!(responses.descriptors[0].streaming_token.as_deref(), Some("SDT"));

        let bodies = transport.bodies.lock();
        let web = &bodies[0];
        assert_eq!(web["serviceIntegrityDimensions"]["poToken"], "PRT");
        assert_eq!(web["context"]["client"]["visitorData"], "VD");
        assert_eq!(
            web["playbackContext"]["contentPlaybackContext"]["signatureTimestamp"],
            19834
        );
        // the web token never leaks into another profile's request
        assert_eq!(bodies.len(), 2);
        assert!(bodies[1..]
            .iter()
            .all(|b| b.get("serviceIntegrityDimensions").is_none()));
    }

    #[test]
    fn identity_check_uses_echoed_id() {
        let ok = json!({ "videoDetails": { "videoId": "dQw4w9WgXcQ" } });
        let other = json!({ "videoDetails": { "videoId": "aqz-KE-bpKQ" } });
        assert!(is_response_for(&ok, "dQw4w9WgXcQ"));
        assert!(!is_response_for(&other, "dQw4w9WgXcQ"));
        assert!(!is_response_for(&json!({}), "dQw4w9WgXcQ"));

        match mismatch("dQw4w9WgXcQ", &other) {
            ExtractionError::ResponseIdentityMismatch { requested, returned } => {
                assert_eq!(requested, "dQw4w9WgXcQ");
                assert_eq!(returned.as_deref(), Some("aqz-KE-bpKQ"));
            }
            e => panic!("unexpected {e:?}"),
        }
    }

    #[test]
    fn descriptor_carries_streaming_token() {
        let response = json!({ "streamingData": { "formats": [] } });
        let token = PoTokenResult {
            visitor_data: "vd".into(),
            player_request_token: "prt".into(),
            streaming_data_token: Some("sdt".into()),
        };
        let d = descriptor_from(&response, &ANDROID, SessionNonce::generate(), Some(&token)).unwrap();
        assert_eq!(d.streaming_token.as_deref(), Some("sdt"));
        assert!(descriptor_from(&json!({}), &ANDROID, SessionNonce::generate(), None).is_none());
    }
}
