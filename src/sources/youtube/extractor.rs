use serde::Serialize;
use serde_json::Value;

use super::{
    streams::StreamType,
    url::watch_url,
    utils::{find_key, get_array, get_bool, get_int, get_object, get_str, parse_count, parse_duration, text_of},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub start_seconds: u64,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub language_code: String,
    pub name: Option<String>,
    pub url: String,
    pub auto_generated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub url: String,
    pub title: String,
    pub uploader_name: Option<String>,
    pub uploader_id: Option<String>,
    pub uploader_url: Option<String>,
    pub duration_secs: u64,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub thumbnails: Vec<Thumbnail>,
    pub keywords: Vec<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub publish_date: Option<String>,
    pub stream_type: StreamType,
    pub age_limit: u8,
    pub chapters: Vec<Chapter>,
    pub related_ids: Vec<String>,
    pub captions: Vec<CaptionTrack>,
}

pub fn stream_type(player: &Value) -> StreamType {
    if player.pointer("/playabilityStatus/liveStreamability").is_some() {
        StreamType::Live
    } else if player
        .pointer("/videoDetails/isPostLiveDvr")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        StreamType::PostLive
    } else {
        StreamType::Video
    }
}

fn thumbnails(container: &Value) -> Vec<Thumbnail> {
    container
        .get("thumbnails")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|t| {
            Some(Thumbnail {
                url: get_str(t, "url")?.to_string(),
                width: get_int(t, "width", 0) as u32,
                height: get_int(t, "height", 0) as u32,
            })
        })
        .collect()
}

pub fn caption_tracks(player: &Value) -> Vec<CaptionTrack> {
    let tracks = player
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array);
    tracks
        .into_iter()
        .flatten()
        .filter_map(|track| {
            Some(CaptionTrack {
                language_code: get_str(track, "languageCode")?.to_string(),
                name: track.get("name").and_then(text_of),
                url: get_str(track, "baseUrl")?.to_string(),
                auto_generated: get_str(track, "kind") == Some("asr"),
            })
        })
        .collect()
}

/// Reads everything the player response knows about the video. `age_gated`
/// is set when the embedded fallback had to be used.
pub fn from_player(player: &Value, age_gated: bool) -> VideoMetadata {
    let empty = Value::Null;
    let details = player.get("videoDetails").unwrap_or(&empty);
    let microformat = player
        .pointer("/microformat/playerMicroformatRenderer")
        .unwrap_or(&empty);

    let id = get_str(details, "videoId").unwrap_or_default().to_string();
    let uploader_id = get_str(details, "channelId").map(str::to_string);
    let family_safe = get_bool(microformat, "isFamilySafe", true);

    VideoMetadata {
        url: watch_url(&id),
        title: get_str(details, "title").unwrap_or_default().to_string(),
        uploader_name: get_str(details, "author").map(str::to_string),
        uploader_url: uploader_id
            .as_ref()
            .map(|c| format!("https://www.youtube.com/channel/{c}")),
        uploader_id,
        duration_secs: get_int(details, "lengthSeconds", 0).max(0) as u64,
        view_count: u64::try_from(get_int(details, "viewCount", -1)).ok(),
        thumbnails: get_object(details, "thumbnail")
            .map(thumbnails)
            .unwrap_or_default(),
        keywords: get_array(details, "keywords")
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        short_description: get_str(details, "shortDescription").map(str::to_string),
        category: get_str(microformat, "category").map(str::to_string),
        publish_date: get_str(microformat, "publishDate")
            .or_else(|| get_str(microformat, "uploadDate"))
            .map(str::to_string),
        stream_type: stream_type(player),
        age_limit: if age_gated || !family_safe { 18 } else { 0 },
        captions: caption_tracks(player),
        id,
        ..Default::default()
    }
}

fn watch_contents(next: &Value) -> &[Value] {
    next.pointer("/contents/twoColumnWatchNextResults/results/results/contents")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn description(next: &Value) -> Option<String> {
    let secondary = watch_contents(next)
        .iter()
        .find_map(|c| c.get("videoSecondaryInfoRenderer"))?;
    secondary
        .pointer("/attributedDescription/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| secondary.get("description").and_then(text_of))
}

fn like_count(next: &Value) -> Option<u64> {
    let primary = watch_contents(next)
        .iter()
        .find_map(|c| c.get("videoPrimaryInfoRenderer"))?;
    if let Some(like) = find_key(primary, "likeButtonViewModel") {
        if let Some(text) = find_key(like, "accessibilityText").and_then(Value::as_str) {
            return parse_count(text);
        }
    }
    let toggle = find_key(primary, "toggleButtonRenderer")?;
    toggle
        .pointer("/defaultText/accessibility/accessibilityData/label")
        .and_then(Value::as_str)
        .and_then(parse_count)
}

fn player_bar_chapters(next: &Value) -> Vec<Chapter> {
    let markers = next
        .pointer(
            "/playerOverlays/playerOverlayRenderer/decoratedPlayerBarRenderer/decoratedPlayerBarRenderer/playerBar/multiMarkersPlayerBarRenderer/markersMap",
        )
        .and_then(Value::as_array);
    let Some(chapters) = markers
        .into_iter()
        .flatten()
        .find_map(|m| m.pointer("/value/chapters").and_then(Value::as_array))
    else {
        return Vec::new();
    };

    chapters
        .iter()
        .filter_map(|c| c.get("chapterRenderer"))
        .filter_map(|c| {
            Some(Chapter {
                title: c.get("title").and_then(text_of)?,
                start_seconds: (get_int(c, "timeRangeStartMillis", 0).max(0) / 1000) as u64,
                thumbnail: get_object(c, "thumbnail")
                    .map(thumbnails)
                    .and_then(|t| t.last().map(|t| t.url.clone())),
            })
        })
        .collect()
}

fn macro_marker_chapters(next: &Value) -> Vec<Chapter> {
    let Some(markers) = get_array(next, "engagementPanels")
        .iter()
        .find_map(|p| find_key(p, "macroMarkersListRenderer"))
    else {
        return Vec::new();
    };

    get_array(markers, "contents")
        .iter()
        .filter_map(|c| c.get("macroMarkersListItemRenderer"))
        .filter_map(|c| {
            Some(Chapter {
                title: c.get("title").and_then(text_of)?,
                start_seconds: c
                    .get("timeDescription")
                    .and_then(text_of)
                    .and_then(|t| parse_duration(&t))?,
                thumbnail: get_object(c, "thumbnail")
                    .map(thumbnails)
                    .and_then(|t| t.last().map(|t| t.url.clone())),
            })
        })
        .collect()
}

fn related_ids(next: &Value) -> Vec<String> {
    next.pointer("/contents/twoColumnWatchNextResults/secondaryResults/secondaryResults/results")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| {
            item.pointer("/compactVideoRenderer/videoId")
                .or_else(|| item.pointer("/lockupViewModel/contentId"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

/// Fills the fields only the "next" response carries.
pub fn apply_next(metadata: &mut VideoMetadata, next: &Value) {
    metadata.description = description(next).or_else(|| metadata.short_description.clone());
    metadata.like_count = like_count(next);
    metadata.chapters = player_bar_chapters(next);
    if metadata.chapters.is_empty() {
        metadata.chapters = macro_marker_chapters(next);
    }
    metadata.related_ids = related_ids(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn player() -> Value {
        json!({
            "playabilityStatus": { "status": "OK" },
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Never Gonna Give You Up",
                "lengthSeconds": "213",
                "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "author": "Rick Astley",
                "viewCount": "1500000000",
                "keywords": ["rick", "astley"],
                "shortDescription": "The official video",
                "thumbnail": { "thumbnails": [{ "url": "https://i.ytimg.com/a.jpg", "width": 120, "height": 90 }] }
            },
            "microformat": { "playerMicroformatRenderer": {
                "category": "Music", "publishDate": "2009-10-24", "isFamilySafe": true
            }},
            "captions": { "playerCaptionsTracklistRenderer": { "captionTracks": [
                { "baseUrl": "https://www.youtube.com/api/timedtext?v=x&lang=en", "languageCode": "en",
                  "name": { "simpleText": "English" } },
                { "baseUrl": "https://www.youtube.com/api/timedtext?v=x&lang=en&kind=asr", "languageCode": "en",
                  "name": { "runs": [{ "text": "English (auto-generated)" }] }, "kind": "asr" }
            ]}}
        })
    }

    #[test]
    fn reads_player_fields() {
        let meta = from_player(&player(), false);
        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(meta.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(meta.duration_secs, 213);
        assert_eq!(meta.view_count, Some(1_500_000_000));
        assert_eq!(meta.uploader_url.as_deref(), Some("https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw"));
        assert_eq!(meta.category.as_deref(), Some("Music"));
        assert_eq!(meta.keywords, vec!["rick", "astley"]);
        assert_eq!(meta.stream_type, StreamType::Video);
        assert_eq!(meta.age_limit, 0);
        assert_eq!(meta.captions.len(), 2);
        assert!(!meta.captions[0].auto_generated);
        assert!(meta.captions[1].auto_generated);
        assert_eq!(from_player(&player(), true).age_limit, 18);
    }

    #[test]
    fn live_and_post_live_types() {
        let live = json!({ "playabilityStatus": { "status": "OK", "liveStreamability": {} } });
        assert_eq!(stream_type(&live), StreamType::Live);
        let dvr = json!({ "videoDetails": { "isPostLiveDvr": true } });
        assert_eq!(stream_type(&dvr), StreamType::PostLive);
    }

    #[test]
    fn next_response_supplements() {
        let next = json!({
            "contents": { "twoColumnWatchNextResults": {
                "results": { "results": { "contents": [
                    { "videoPrimaryInfoRenderer": { "videoActions": { "menuRenderer": { "topLevelButtons": [
                        { "segmentedLikeDislikeButtonViewModel": { "likeButtonViewModel": {
                            "toggleButtonViewModel": { "defaultButtonViewModel": { "buttonViewModel": {
                                "accessibilityText": "like this video along with 18,123,456 other people"
                            }}}
                        }}}
                    ]}}}},
                    { "videoSecondaryInfoRenderer": { "attributedDescription": { "content": "Full description" } } }
                ]}},
                "secondaryResults": { "secondaryResults": { "results": [
                    { "compactVideoRenderer": { "videoId": "aaaaaaaaaaa" } },
                    { "lockupViewModel": { "contentId": "bbbbbbbbbbb" } },
                    { "continuationItemRenderer": {} }
                ]}}
            }},
            "engagementPanels": [
                { "engagementPanelSectionListRenderer": { "content": { "macroMarkersListRenderer": { "contents": [
                    { "macroMarkersListItemRenderer": { "title": { "simpleText": "Intro" }, "timeDescription": { "simpleText": "0:00" } } },
                    { "macroMarkersListItemRenderer": { "title": { "simpleText": "Chorus" }, "timeDescription": { "simpleText": "1:05" } } }
                ]}}}}
            ]
        });

        let mut meta = from_player(&player(), false);
        apply_next(&mut meta, &next);
        assert_eq!(meta.description.as_deref(), Some("Full description"));
        assert_eq!(meta.like_count, Some(18_123_456));
        assert_eq!(meta.related_ids, vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        assert_eq!(meta.chapters.len(), 2);
        assert_eq!(meta.chapters[1].title, "Chorus");
        assert_eq!(meta.chapters[1].start_seconds, 65);
    }

    #[test]
    fn player_bar_chapters_take_precedence() {
        let next = json!({ "playerOverlays": { "playerOverlayRenderer": { "decoratedPlayerBarRenderer": {
            "decoratedPlayerBarRenderer": { "playerBar": { "multiMarkersPlayerBarRenderer": { "markersMap": [
                { "key": "DESCRIPTION_CHAPTERS", "value": { "chapters": [
                    { "chapterRenderer": { "title": { "simpleText": "Start" }, "timeRangeStartMillis": 0 } },
                    { "chapterRenderer": { "title": { "simpleText": "End" }, "timeRangeStartMillis": 120500 } }
                ]}}
            ]}}}
        }}}});
        let mut meta = VideoMetadata::default();
        apply_next(&mut meta, &next);
        assert_eq!(meta.chapters.len(), 2);
        assert_eq!(meta.chapters[1].start_seconds, 120);
    }
}
