use reqwest::Url;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

const ID_LEN: usize = 11;

const WATCH_HOSTS: [&str; 3] = ["www.youtube.com", "youtube.com", "m.youtube.com"];
const SHORT_HOST: &str = "youtu.be";

/// Canonical 11-character video identifier.
///
/// Watched entries are stored under whatever the user typed (a bare id or one
/// of several URL shapes). A `VideoId` is always derived from that raw key on
/// demand and is never written back to the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{input}' is not a video id or a recognized watch URL")]
pub struct InvalidVideoId {
    pub input: String,
}

impl VideoId {
    /// Parses user input into a canonical id.
    ///
    /// Accepts a bare id, `https://{www.,m.,}youtube.com/watch?v=<id>` or
    /// `https://youtu.be/<id>`. Anything else is rejected rather than guessed.
    pub fn parse(raw: &str) -> Result<Self, InvalidVideoId> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(InvalidVideoId { input: raw.to_owned() });
        }

        if is_valid_id(value) {
            return Ok(VideoId(value.to_owned()));
        }

        Self::from_url(value).ok_or_else(|| InvalidVideoId { input: raw.to_owned() })
    }

    fn from_url(value: &str) -> Option<Self> {
        let url = Url::parse(value).ok()?;
        let host = url.host_str()?;

        // Url lower-cases the host and hides default ports and credentials.
        // The authority must be exactly one of the known hosts as typed.
        if raw_authority(value)? != host {
            return None;
        }

        let candidate = if WATCH_HOSTS.contains(&host) && url.path() == "/watch" {
            url.query_pairs()
                .find(|(key, v)| key == "v" && !v.is_empty())
                .map(|(_, v)| v.into_owned())?
        } else if host == SHORT_HOST {
            url.path().trim_matches('/').to_owned()
        } else {
            return None;
        };

        is_valid_id(&candidate).then_some(VideoId(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `https://www.youtube.com/watch?v=<id>`, built without validating `id`.
pub fn watch_url_for(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// `https://youtu.be/<id>`, built without validating `id`.
pub fn short_url_for(id: &str) -> String {
    format!("https://{}/{}", SHORT_HOST, id)
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text between `://` and the first `/`, `?` or `#`.
fn raw_authority(value: &str) -> Option<&str> {
    let (_, rest) = value.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn is_valid_id(s: &str) -> bool {
    s.len() == ID_LEN
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bare_id_accepted() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_bare_id_is_trimmed() {
        let id = VideoId::parse("  dQw4w9WgXcQ\n").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_url_hosts() {
        for host in WATCH_HOSTS {
            let url = format!("https://{}/watch?v=dQw4w9WgXcQ", host);
            assert_eq!(VideoId::parse(&url).unwrap().as_str(), "dQw4w9WgXcQ", "{host}");
        }
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        let id = VideoId::parse("https://www.youtube.com/watch?list=PL1&v=dQw4w9WgXcQ&t=42s").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_blank_v_is_skipped() {
        let id = VideoId::parse("https://www.youtube.com/watch?v=&v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_authority_must_match_exactly() {
        assert!(VideoId::parse("https://WWW.YOUTUBE.COM/watch?v=dQw4w9WgXcQ").is_err());
        assert!(VideoId::parse("https://www.youtube.com:443/watch?v=dQw4w9WgXcQ").is_err());
        assert!(VideoId::parse("https://user@www.youtube.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(VideoId::parse("https://YOUTU.BE/dQw4w9WgXcQ").is_err());
        assert_eq!(raw_authority("https://youtu.be?x#y"), Some("youtu.be"));
    }

    #[test]
    fn test_short_url() {
        assert_eq!(VideoId::parse("https://youtu.be/dQw4w9WgXcQ").unwrap().as_str(), "dQw4w9WgXcQ");
        assert_eq!(VideoId::parse("https://youtu.be/dQw4w9WgXcQ/").unwrap().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_rejections() {
        assert!(VideoId::parse("").is_err());
        assert!(VideoId::parse("   ").is_err());
        assert!(VideoId::parse("https://example.com/watch?v=short").is_err());
        assert!(VideoId::parse("https://example.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(VideoId::parse("https://www.youtube.com/watch?v=short").is_err());
        assert!(VideoId::parse("https://www.youtube.com/embed/dQw4w9WgXcQ").is_err());
        assert!(VideoId::parse("https://www.youtube.com/watch").is_err());
        assert!(VideoId::parse("https://youtu.be/").is_err());
        assert!(VideoId::parse("https://youtu.be/dQw4w9WgXcQextra").is_err());
        assert!(VideoId::parse("https://www.youtube.com:8443/watch?v=dQw4w9WgXcQ").is_err());
        // No scheme means no host to match against
        assert!(VideoId::parse("youtube.com/watch?v=dQw4w9WgXcQ").is_err());
        // Right length, wrong characters
        assert!(VideoId::parse("dQw4w9WgX!Q").is_err());
    }

    #[test]
    fn test_error_keeps_input() {
        let err = VideoId::parse("nope").unwrap_err();
        assert_eq!(err.input, "nope");
    }

    #[test]
    fn test_rebuilt_urls_parse_back() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let watch = watch_url_for(id.as_str());
        let short = short_url_for(id.as_str());
        assert_eq!(watch, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(short, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(VideoId::parse(&watch).unwrap(), id);
        assert_eq!(VideoId::parse(&short).unwrap(), id);
    }

    proptest! {
        #[test]
        fn prop_bare_ids_are_fixed_points(id in "[A-Za-z0-9_-]{11}") {
            let parsed = VideoId::parse(&id).unwrap();
            prop_assert_eq!(parsed.as_str(), id.as_str());
        }

        #[test]
        fn prop_watch_urls_yield_v(
            id in "[A-Za-z0-9_-]{11}",
            host_idx in 0usize..3,
        ) {
            let url = format!("https://{}/watch?v={}", WATCH_HOSTS[host_idx], id);
            let parsed = VideoId::parse(&url).unwrap();
            prop_assert_eq!(parsed.as_str(), id.as_str());
        }

        #[test]
        fn prop_short_urls_yield_path(id in "[A-Za-z0-9_-]{11}") {
            let url = format!("https://youtu.be/{}", id);
            let parsed = VideoId::parse(&url).unwrap();
            prop_assert_eq!(parsed.as_str(), id.as_str());
        }

        #[test]
        fn prop_wrong_length_rejected(id in "[A-Za-z0-9_-]{1,10}|[A-Za-z0-9_-]{12,20}") {
            prop_assert!(VideoId::parse(&id).is_err());
            let url = format!("https://www.youtube.com/watch?v={}", id);
            prop_assert!(VideoId::parse(&url).is_err());
        }
    }
}
