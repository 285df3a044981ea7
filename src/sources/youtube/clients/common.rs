use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::debug;

use super::{ClientKind, ClientProfile, INNERTUBE_API};
use crate::{
    common::{
        errors::{ExtractionError, ExtractionResult},
        types::{SessionNonce, random_request_tag},
    },
    transport::{HttpRequest, Localization, Transport},
};

/// Per-request values layered over a [`ClientProfile`].
#[derive(Debug, Clone, Copy)]
pub struct PlayerRequest<'a> {
    pub video_id: &'a str,
    pub cpn: &'a SessionNonce,
    pub localization: &'a Localization,
    pub visitor_data: Option<&'a str>,
    /// Only honoured for profiles that declare the script version.
    pub signature_timestamp: Option<u32>,
    pub po_token: Option<&'a str>,
}

/// Visitor data obtained for each profile during one session. A value, once
/// stored, is kept for the rest of the session.
#[derive(Debug, Default)]
pub struct VisitorDataCache {
    values: Mutex<HashMap<ClientKind, String>>,
}

impl VisitorDataCache {
    pub fn get(&self, kind: ClientKind) -> Option<String> {
        self.values.lock().get(&kind).cloned()
    }

    /// Stores `value` unless the profile already has one; returns the kept value.
    pub fn set_once(&self, kind: ClientKind, value: String) -> String {
        self.values.lock().entry(kind).or_insert(value).clone()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
    }
}

pub fn build_context(
    profile: &ClientProfile,
    localization: &Localization,
    visitor_data: Option<&str>,
) -> Value {
    let mut client = json!({
        "clientName": profile.client_name,
        "clientVersion": profile.client_version,
        "hl": localization.hl,
        "gl": localization.gl,
        "utcOffsetMinutes": 0,
    });
    let fields = client
        .as_object_mut()
        .expect("json! object literal");

    if profile.mobile_query {
        fields.insert("userAgent".into(), profile.user_agent.into());
    }
    if let Some(platform) = profile.platform {
        fields.insert("platform".into(), platform.into());
    }
    if let Some(screen) = profile.client_screen {
        fields.insert("clientScreen".into(), screen.into());
    }
    if let Some(device) = &profile.device {
        fields.insert("deviceMake".into(), device.make.into());
        fields.insert("deviceModel".into(), device.model.into());
        fields.insert("osName".into(), device.os_name.into());
        fields.insert("osVersion".into(), device.os_version.into());
        if let Some(sdk) = device.android_sdk_version {
            fields.insert("androidSdkVersion".into(), sdk.into());
        }
    }
    if let Some(vd) = visitor_data {
        fields.insert("visitorData".into(), vd.into());
    }

    let mut context = json!({
        "client": client,
        "user": { "lockedSafetyMode": false },
        "request": { "useSsl": true, "internalExperimentFlags": [] },
    });
    if let Some(embed_url) = profile.embed_url {
        context["thirdParty"] = json!({ "embedUrl": embed_url });
    }
    context
}

fn with_profile_headers(
    mut request: HttpRequest,
    profile: &ClientProfile,
    visitor_data: Option<&str>,
) -> HttpRequest {
    request = request
        .header("User-Agent", profile.user_agent)
        .header("X-YouTube-Client-Name", profile.client_id.to_string())
        .header("X-YouTube-Client-Version", profile.client_version);
    if let Some(origin) = profile.origin {
        request = request.header("Origin", origin).header("Referer", origin);
    }
    if let Some(vd) = visitor_data {
        request = request.header("X-Goog-Visitor-Id", vd);
    }
    request
}

pub fn player_body(profile: &ClientProfile, request: &PlayerRequest<'_>) -> Value {
    let mut body = json!({
        "context": build_context(profile, request.localization, request.visitor_data),
        "videoId": request.video_id,
        "cpn": request.cpn.as_str(),
        "contentCheckOk": true,
        "racyCheckOk": true,
    });

    if profile.sends_signature_timestamp {
        if let Some(sts) = request.signature_timestamp {
            body["playbackContext"] = json!({
                "contentPlaybackContext": {
                    "signatureTimestamp": sts,
                    "referer": format!("https://www.youtube.com/watch?v={}", request.video_id),
                    "html5Preference": "HTML5_PREF_WANTS",
                }
            });
        }
    }
    if let Some(token) = request.po_token {
        body["serviceIntegrityDimensions"] = json!({ "poToken": token });
    }
    body
}

pub fn player_http_request(profile: &ClientProfile, request: &PlayerRequest<'_>) -> HttpRequest {
    let mut url = format!("{}/youtubei/v1/player?prettyPrint=false", profile.api_base);
    if profile.mobile_query {
        url.push_str(&format!("&t={}&id={}", random_request_tag(), request.video_id));
    }
    let http = HttpRequest::post_json(url, &player_body(profile, request))
        .localized(request.localization);
    with_profile_headers(http, profile, request.visitor_data)
}

pub fn next_http_request(
    profile: &ClientProfile,
    video_id: &str,
    localization: &Localization,
    visitor_data: Option<&str>,
) -> HttpRequest {
    let body = json!({
        "context": build_context(profile, localization, visitor_data),
        "videoId": video_id,
        "contentCheckOk": true,
        "racyCheckOk": true,
    });
    let url = format!("{}/youtubei/v1/next?prettyPrint=false", profile.api_base);
    with_profile_headers(HttpRequest::post_json(url, &body).localized(localization), profile, visitor_data)
}

/// Posts `request` and parses the JSON answer.
pub async fn execute_json(transport: &dyn Transport, request: HttpRequest) -> ExtractionResult<Value> {
    let url = request.url.clone();
    let response = transport.execute(request).await?.check()?;
    let value = response.json()?;
    debug!("{} answered with {} bytes", url, response.body.len());
    Ok(value)
}

/// Asks the backend for a fresh visitor id on behalf of `profile`.
pub async fn fetch_visitor_data(
    transport: &dyn Transport,
    profile: &ClientProfile,
    localization: &Localization,
) -> ExtractionResult<String> {
    let body = json!({ "context": build_context(profile, localization, None) });
    let url = format!("{INNERTUBE_API}/youtubei/v1/visitor_id?prettyPrint=false");
    let request = with_profile_headers(
        HttpRequest::post_json(url, &body).localized(localization),
        profile,
        None,
    );

    let response = execute_json(transport, request).await?;
    response
        .pointer("/responseContext/visitorData")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ExtractionError::malformed("visitor_id response without visitorData"))
}

/// Returns the session's visitor data for `profile`, fetching it on first use.
pub async fn visitor_data_for(
    transport: &dyn Transport,
    cache: &VisitorDataCache,
    profile: &ClientProfile,
    localization: &Localization,
) -> ExtractionResult<String> {
    if let Some(vd) = cache.get(profile.kind) {
        return Ok(vd);
    }
    let fetched = fetch_visitor_data(transport, profile, localization).await?;
    Ok(cache.set_once(profile.kind, fetched))
}
