use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::common::{
    errors::{ExtractionError, ExtractionResult},
    types::VideoId,
};

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("static regex"));

const HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Path prefixes whose next segment is the video id.
const ID_PATHS: &[&str] = &["shorts", "live", "embed", "v", "e"];

pub fn is_video_id(candidate: &str) -> bool {
    ID_RE.is_match(candidate)
}

fn checked(candidate: &str, input: &str) -> ExtractionResult<VideoId> {
    if is_video_id(candidate) {
        Ok(VideoId::from(candidate))
    } else {
        Err(ExtractionError::UnsupportedUrl(input.to_string()))
    }
}

/// Extracts the video id from any of the usual link shapes or a bare id.
pub fn parse_video_id(input: &str) -> ExtractionResult<VideoId> {
    let input = input.trim();
    if is_video_id(input) {
        return Ok(VideoId::from(input));
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&with_scheme)
        .map_err(|_| ExtractionError::UnsupportedUrl(input.to_string()))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());

    if host == "youtu.be" || host == "www.youtu.be" {
        let id = segments.next().unwrap_or_default();
        return checked(id, input);
    }
    if !HOSTS.contains(&host.as_str()) {
        return Err(ExtractionError::UnsupportedUrl(input.to_string()));
    }

    match segments.next() {
        Some("watch") | None => {
            let id = url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())
                .ok_or_else(|| ExtractionError::UnsupportedUrl(input.to_string()))?;
            checked(&id, input)
        }
        Some(prefix) if ID_PATHS.contains(&prefix) => {
            checked(segments.next().unwrap_or_default(), input)
        }
        Some(_) => Err(ExtractionError::UnsupportedUrl(input.to_string())),
    }
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::ErrorKind;

    #[test]
    fn accepts_known_shapes() {
        let cases = [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
            "https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RD",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?feature=share",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
        ];
        for case in cases {
            assert_eq!(parse_video_id(case).unwrap().0, "dQw4w9WgXcQ", "{case}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        let cases = [
            "",
            "short",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/channel/UC38IQsAvIsxxjztdMZQtwHA",
            "https://www.youtube.com/watch?v=tooShort",
            "https://www.youtube.com/playlist?list=PL123",
        ];
        for case in cases {
            let err = parse_video_id(case).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedUrl, "{case}");
        }
    }
}
