use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::{
    common::errors::{ExtractionError, ExtractionResult},
    transport::{HttpRequest, Transport},
};

pub const IFRAME_API_URL: &str = "https://www.youtube.com/iframe_api";
const EMBED_URL: &str = "https://www.youtube.com/embed/";
const BASE_URL: &str = "https://www.youtube.com";

static IFRAME_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"player\\?/([a-z0-9]{8})\\?/").expect("static regex"));
static JS_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""jsUrl":"([^"]+)""#).expect("static regex"));
static SCRIPT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script[^>]+src="([^"]*/player/[^"]*/base\.js)""#).expect("static regex")
});
static LOCALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-z]{2}_[A-Z]{2})/").expect("static regex"));

/// Builds the script URL for a player version hash.
pub fn script_url_for_hash(hash: &str) -> String {
    format!("{BASE_URL}/s/player/{hash}/player_ias.vflset/en_US/base.js")
}

/// Makes a scraped script path absolute and pins its locale to `en_US`.
pub fn normalize_script_url(raw: &str) -> String {
    let raw = raw.replace("\\/", "/");
    let localized = LOCALE_RE.replace(&raw, "/en_US/");
    if localized.starts_with("//") {
        format!("https:{localized}")
    } else if localized.starts_with('/') {
        format!("{BASE_URL}{localized}")
    } else if localized.starts_with("http") {
        localized.into_owned()
    } else {
        format!("{BASE_URL}/{localized}")
    }
}

async fn from_iframe_api(transport: &dyn Transport) -> ExtractionResult<String> {
    let body = transport
        .execute(HttpRequest::get(IFRAME_API_URL))
        .await?
        .check()?
        .body;
    IFRAME_HASH_RE
        .captures(&body)
        .map(|caps| script_url_for_hash(&caps[1]))
        .ok_or_else(|| ExtractionError::malformed("no player hash in iframe api"))
}

async fn from_embed_page(transport: &dyn Transport, video_id: &str) -> ExtractionResult<String> {
    let body = transport
        .execute(HttpRequest::get(format!("{EMBED_URL}{video_id}")).header("Referer", BASE_URL))
        .await?
        .check()?
        .body;
    JS_URL_RE
        .captures(&body)
        .or_else(|| SCRIPT_TAG_RE.captures(&body))
        .map(|caps| normalize_script_url(&caps[1]))
        .ok_or_else(|| ExtractionError::malformed("no player script url in embed page"))
}

/// Finds the current player script URL, preferring the iframe API and falling
/// back to the embed page of `video_id`.
pub async fn discover_script_url(
    transport: &dyn Transport,
    video_id: &str,
) -> ExtractionResult<String> {
    match from_iframe_api(transport).await {
        Ok(url) => Ok(url),
        Err(e) => {
            warn!("iframe api lookup failed ({}), trying embed page", e);
            from_embed_page(transport, video_id).await
        }
    }
}

pub async fn download_script(transport: &dyn Transport, url: &str) -> ExtractionResult<String> {
    let body = transport.execute(HttpRequest::get(url)).await?.check()?.body;
    if body.is_empty() {
        return Err(ExtractionError::malformed(format!("empty player script at {url}")));
    }
    debug!("downloaded player script {} ({} bytes)", url, body.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_from_iframe_api_body() {
        let body = r#"var scriptUrl = 'https:\/\/www.youtube.com\/s\/player\/a1b2c3d4\/www-widgetapi.vflset\/www-widgetapi.js';"#;
        let caps = IFRAME_HASH_RE.captures(body).unwrap();
        assert_eq!(&caps[1], "a1b2c3d4");
        assert_eq!(
            script_url_for_hash(&caps[1]),
            "https://www.youtube.com/s/player/a1b2c3d4/player_ias.vflset/en_US/base.js"
        );
    }

    #[test]
    fn normalizes_relative_and_localized_urls() {
        assert_eq!(
            normalize_script_url("/s/player/a1b2c3d4/player_ias.vflset/de_DE/base.js"),
            "https://www.youtube.com/s/player/a1b2c3d4/player_ias.vflset/en_US/base.js"
        );
        assert_eq!(
            normalize_script_url("//www.youtube.com/s/player/x/base.js"),
            "https://www.youtube.com/s/player/x/base.js"
        );
        assert_eq!(
            normalize_script_url("https://www.youtube.com/s/player/x/base.js"),
            "https://www.youtube.com/s/player/x/base.js"
        );
    }

    #[test]
    fn embed_page_script_tag() {
        let page = r#"<script src="/s/player/0badf00d/player_ias.vflset/fr_FR/base.js" nonce="x"></script>"#;
        let caps = SCRIPT_TAG_RE.captures(page).unwrap();
        assert_eq!(
            normalize_script_url(&caps[1]),
            "https://www.youtube.com/s/player/0badf00d/player_ias.vflset/en_US/base.js"
        );
    }
}
