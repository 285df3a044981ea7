//! The InnerTube client profiles we impersonate.
//!
//! Each profile is plain data; [`common`] turns a profile plus per-request
//! values into the HTTP request, so adding a client is adding a table row.

pub mod common;

use serde::Serialize;

pub use common::{PlayerRequest, VisitorDataCache};

pub const INNERTUBE_API: &str = "https://youtubei.googleapis.com";
pub const WEB_API: &str = "https://www.youtube.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientKind {
    Web,
    WebEmbedded,
    Tv,
    Android,
    Ios,
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(profile(*self).name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub make: &'static str,
    pub model: &'static str,
    pub os_name: &'static str,
    pub os_version: &'static str,
    pub android_sdk_version: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    pub kind: ClientKind,
    /// Human readable name used in logs.
    pub name: &'static str,
    /// `clientName` in the request context.
    pub client_name: &'static str,
    /// Numeric id sent as `X-YouTube-Client-Name`.
    pub client_id: u32,
    pub client_version: &'static str,
    pub user_agent: &'static str,
    pub platform: Option<&'static str>,
    pub client_screen: Option<&'static str>,
    pub device: Option<DeviceInfo>,
    /// Host the player endpoint is called on.
    pub api_base: &'static str,
    /// Origin/Referer for browser-like clients.
    pub origin: Option<&'static str>,
    pub embed_url: Option<&'static str>,
    /// Must obtain visitor data from `/visitor_id` before the player request.
    pub needs_visitor_data: bool,
    /// Stream URLs may be ciphered, so the request declares the script version.
    pub sends_signature_timestamp: bool,
    /// Mobile player endpoints expect `&t=...&id=...` on the query string.
    pub mobile_query: bool,
}

pub static WEB: ClientProfile = ClientProfile {
    kind: ClientKind::Web,
    name: "Desktop-Web",
    client_name: "WEB",
    client_id: 1,
    client_version: "2.20260114.01.00",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    platform: Some("DESKTOP"),
    client_screen: None,
    device: None,
    api_base: WEB_API,
    origin: Some(WEB_API),
    embed_url: None,
    needs_visitor_data: false,
    sends_signature_timestamp: true,
    mobile_query: false,
};

pub static WEB_EMBEDDED: ClientProfile = ClientProfile {
    kind: ClientKind::WebEmbedded,
    name: "Embedded-Web",
    client_name: "WEB_EMBEDDED_PLAYER",
    client_id: 56,
    client_version: "1.20250219.01.00",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    platform: Some("DESKTOP"),
    client_screen: Some("EMBED"),
    device: None,
    api_base: WEB_API,
    origin: Some(WEB_API),
    embed_url: Some(WEB_API),
    needs_visitor_data: false,
    sends_signature_timestamp: true,
    mobile_query: false,
};

pub static TV: ClientProfile = ClientProfile {
    kind: ClientKind::Tv,
    name: "TV",
    client_name: "TVHTML5",
    client_id: 7,
    client_version: "7.20250219.19.00",
    user_agent: "Mozilla/5.0 (SmartHub; SMART-TV; U; Linux/SmartTV; Maple2012) \
                 AppleWebKit/534.7 (KHTML, like Gecko) SmartTV Safari/534.7",
    platform: Some("TV"),
    client_screen: None,
    device: None,
    api_base: WEB_API,
    origin: Some(WEB_API),
    embed_url: None,
    needs_visitor_data: false,
    sends_signature_timestamp: true,
    mobile_query: false,
};

pub static ANDROID: ClientProfile = ClientProfile {
    kind: ClientKind::Android,
    name: "Android",
    client_name: "ANDROID",
    client_id: 3,
    client_version: "20.01.35",
    user_agent: "com.google.android.youtube/20.01.35 (Linux; U; Android 14) gzip",
    platform: Some("MOBILE"),
    client_screen: None,
    device: Some(DeviceInfo {
        make: "Google",
        model: "Pixel 6",
        os_name: "Android",
        os_version: "14",
        android_sdk_version: Some(34),
    }),
    api_base: INNERTUBE_API,
    origin: None,
    embed_url: None,
    needs_visitor_data: true,
    sends_signature_timestamp: false,
    mobile_query: true,
};

pub static IOS: ClientProfile = ClientProfile {
    kind: ClientKind::Ios,
    name: "iOS",
    client_name: "IOS",
    client_id: 5,
    client_version: "21.02.1",
    user_agent: "com.google.ios.youtube/21.02.1 (iPhone16,2; U; CPU iOS 18_2 like Mac OS X;)",
    platform: Some("MOBILE"),
    client_screen: None,
    device: Some(DeviceInfo {
        make: "Apple",
        model: "iPhone16,2",
        os_name: "iPhone",
        os_version: "18.2.22C152",
        android_sdk_version: None,
    }),
    api_base: INNERTUBE_API,
    origin: None,
    embed_url: None,
    needs_visitor_data: true,
    sends_signature_timestamp: false,
    mobile_query: true,
};

pub fn profile(kind: ClientKind) -> &'static ClientProfile {
    match kind {
        ClientKind::Web => &WEB,
        ClientKind::WebEmbedded => &WEB_EMBEDDED,
        ClientKind::Tv => &TV,
        ClientKind::Android => &ANDROID,
        ClientKind::Ios => &IOS,
    }
}

pub fn all() -> [&'static ClientProfile; 5] {
    [&WEB, &WEB_EMBEDDED, &TV, &ANDROID, &IOS]
}
