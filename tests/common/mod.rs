#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tubex::{
    common::errors::ExtractionResult,
    configs::Config,
    sources::youtube::YouTubeSource,
    transport::{HttpRequest, HttpResponse, Transport},
};

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
/// What the backend hands suspicious clients instead of the requested video.
pub const DECOY_ID: &str = "aqz-KE-bpKQ";

pub const PLAYER_SCRIPT: &str = r#"var foo=1;signatureTimestamp:19834,
var Xy={ab:function(a,b){a.splice(0,b)},cd:function(a){a.reverse()},ef:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};
Qz=function(a){a=a.split("");Xy.cd(a,4);Xy.ef(a,3);Xy.ab(a,1);return a.join("")};
var bar=function(h){h.s&&(m=Qz(decodeURIComponent(h.s)))};"#;

/// `abcdef` run through the transform in [`PLAYER_SCRIPT`].
pub const EXPECTED_SIGNATURE: &str = "edfba";

const IFRAME_API: &str =
    r"var scriptUrl = 'https:\/\/www.youtube.com\/s\/player\/abcdef12\/www-widgetapi.vflset\/www-widgetapi.js';";

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
}

/// A recorded request: route label plus the parsed JSON body, if any.
#[derive(Debug, Clone)]
pub struct Call {
    pub route: String,
    pub body: Option<Value>,
}

/// Canned backend. Player requests are answered per `clientName`.
pub struct FakeTransport {
    players: Mutex<HashMap<String, Reply>>,
    next: Mutex<Reply>,
    script: Mutex<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            players: Mutex::new(HashMap::new()),
            next: Mutex::new(Reply::Json(next_response())),
            script: Mutex::new(PLAYER_SCRIPT.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn player(self, client_name: &str, reply: Reply) -> Self {
        self.players.lock().insert(client_name.to_string(), reply);
        self
    }

    pub fn next(self, reply: Reply) -> Self {
        *self.next.lock() = reply;
        self
    }

    pub fn script(self, script: &str) -> Self {
        *self.script.lock() = script.to_string();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.route == route).count()
    }

    pub fn body_of(&self, route: &str) -> Option<Value> {
        self.calls
            .lock()
            .iter()
            .find(|c| c.route == route)
            .and_then(|c| c.body.clone())
    }

    fn route(&self, request: &HttpRequest, body: Option<&Value>) -> (String, Reply) {
        let url = request.url.as_str();
        if url.contains("/iframe_api") {
            return ("iframe_api".into(), Reply::Status(200));
        }
        if url.contains("/s/player/") {
            return ("script".into(), Reply::Status(200));
        }
        if url.contains("/youtubei/v1/visitor_id") {
            let reply = json!({ "responseContext": { "visitorData": "CgtWSVNJVE9S" } });
            return ("visitor_id".into(), Reply::Json(reply));
        }
        if url.contains("/youtubei/v1/next") {
            return ("next".into(), self.next.lock().clone());
        }
        if url.contains("/youtubei/v1/player") {
            let client = body
                .and_then(|b| b.pointer("/context/client/clientName"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let reply = self
                .players
                .lock()
                .get(&client)
                .cloned()
                .unwrap_or(Reply::Status(500));
            return (format!("player:{client}"), reply);
        }
        ("unknown".into(), Reply::Status(404))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> ExtractionResult<HttpResponse> {
        let body: Option<Value> = request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok());
        let (route, reply) = self.route(&request, body.as_ref());
        self.calls.lock().push(Call {
            route: route.clone(),
            body,
        });

        let (status, text) = match (route.as_str(), reply) {
            ("iframe_api", _) => (200, IFRAME_API.to_string()),
            ("script", _) => (200, self.script.lock().clone()),
            (_, Reply::Json(value)) => (200, value.to_string()),
            (_, Reply::Status(status)) => (status, String::new()),
        };
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: text,
            final_url: request.url,
        })
    }
}

pub fn source(transport: Arc<FakeTransport>) -> YouTubeSource {
    YouTubeSource::new(&Config::default(), transport)
}

fn details(id: &str) -> Value {
    json!({
        "videoId": id,
        "title": "Never Gonna Give You Up",
        "author": "Rick Astley",
        "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
        "lengthSeconds": "213",
        "viewCount": "1500000000",
    })
}

/// A player response for `id` with an OK verdict.
pub fn player_response(id: &str, streaming_data: Option<Value>) -> Value {
    let mut response = json!({
        "responseContext": { "visitorData": "CgtWSVNJVE9S" },
        "playabilityStatus": { "status": "OK" },
        "videoDetails": details(id),
    });
    if let Some(data) = streaming_data {
        response["streamingData"] = data;
    }
    response
}

pub fn denied(id: &str, status: &str, reason: &str) -> Value {
    json!({
        "playabilityStatus": { "status": status, "reason": reason },
        "videoDetails": details(id),
    })
}

/// Watch-next page with a full description and two related videos.
pub fn next_response() -> Value {
    json!({
        "contents": { "twoColumnWatchNextResults": {
            "results": { "results": { "contents": [
                { "videoSecondaryInfoRenderer": { "attributedDescription": {
                    "content": "The official video for Never Gonna Give You Up"
                } } }
            ]}},
            "secondaryResults": { "secondaryResults": { "results": [
                { "compactVideoRenderer": { "videoId": "yPYZpwSpKmA" } },
                { "lockupViewModel": { "contentId": "djV11Xbc914" } }
            ]}}
        }}
    })
}

/// One ciphered audio format (itag 140) and one plain video-only format (itag 137).
pub fn streaming_data(host: &str) -> Value {
    json!({
        "expiresInSeconds": "21540",
        "adaptiveFormats": [
            {
                "itag": 140,
                "signatureCipher": format!("s=abcdef&sp=sig&url=https%3A%2F%2F{host}%2Fvideoplayback%3Fitag%3D140"),
                "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                "bitrate": 130000,
                "audioSampleRate": "44100"
            },
            {
                "itag": 137,
                "url": format!("https://{host}/videoplayback?itag=137"),
                "mimeType": "video/mp4; codecs=\"avc1.640028\"",
                "width": 1920,
                "height": 1080,
                "fps": 30
            }
        ]
    })
}
