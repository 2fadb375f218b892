//! External links into the video detail view
//!
//! A link names the video and may carry the persisted query key and a
//! target offset, e.g. `https://host/VIDEO?t=90&q=KEY`.

use serde::Serialize;
use url::Url;

use crate::navigation::normalize::parse_time_param;
use crate::search::format_seconds;
use crate::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepLink {
    pub video_id: String,
    pub query_key: Option<String>,
    pub offset_seconds: Option<f64>,
}

impl DeepLink {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            query_key: None,
            offset_seconds: None,
        }
    }

    pub fn with_query_key(mut self, key: Option<String>) -> Self {
        self.query_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_offset(mut self, offset: Option<f64>) -> Self {
        self.offset_seconds = offset.filter(|o| o.is_finite() && *o >= 0.0);
        self
    }

    /// Parse an absolute URL or a site-relative path.
    ///
    /// An unparsable `t` is dropped rather than rejected; only a missing
    /// video identifier is an error.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let url = match Url::parse(address) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("https://localhost/")?.join(address)?,
            Err(e) => return Err(e.into()),
        };

        let mut video_id = None;
        let mut query_key = None;
        let mut offset = None;

        for (key, value) in url.query_pairs() {
            match &*key {
                "v" if !value.is_empty() => video_id = Some(value.into_owned()),
                "q" | "queryKey" if query_key.is_none() => query_key = Some(value.into_owned()),
                "t" | "start" if offset.is_none() => offset = parse_time_param(&value),
                _ => {}
            }
        }

        let video_id = video_id
            .or_else(|| {
                url.path_segments()?
                    .filter(|segment| !segment.is_empty())
                    .last()
                    .and_then(|segment| urlencoding::decode(segment).ok())
                    .map(|segment| segment.into_owned())
            })
            .ok_or_else(|| SyncError::InvalidLink(format!("no video identifier in '{}'", address)))?;

        Ok(Self::new(video_id).with_query_key(query_key).with_offset(offset))
    }

    /// Address of this link under `base`
    pub fn to_url(&self, base: &str) -> String {
        let mut url = format!("{}/{}", base.trim_end_matches('/'), urlencoding::encode(&self.video_id));
        let mut params = Vec::new();

        if let Some(offset) = self.offset_seconds {
            params.push(format!("t={}", format_seconds(offset)));
        }
        if let Some(key) = &self.query_key {
            params.push(format!("q={}", urlencoding::encode(key)));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_link() {
        let link = DeepLink::parse("https://aivideo.planeteria.com/abc123?t=90&q=maple").unwrap();
        assert_eq!(link.video_id, "abc123");
        assert_eq!(link.query_key.as_deref(), Some("maple"));
        assert_eq!(link.offset_seconds, Some(90.0));
    }

    #[test]
    fn test_parameters_are_optional() {
        let link = DeepLink::parse("/abc123").unwrap();
        assert_eq!(link, DeepLink::new("abc123"));

        let link = DeepLink::parse("/abc123?start=1m30s").unwrap();
        assert_eq!(link.offset_seconds, Some(90.0));
        assert_eq!(link.query_key, None);

        let link = DeepLink::parse("/abc123?t=soon&queryKey=k").unwrap();
        assert_eq!(link.offset_seconds, None);
        assert_eq!(link.query_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_watch_style_link() {
        let link = DeepLink::parse("https://www.youtube.com/watch?v=w4CMaKF_IXI&t=42").unwrap();
        assert_eq!(link.video_id, "w4CMaKF_IXI");
        assert_eq!(link.offset_seconds, Some(42.0));
    }

    #[test]
    fn test_missing_video_is_invalid() {
        assert!(matches!(DeepLink::parse("https://host/"), Err(SyncError::InvalidLink(_))));
        assert!(matches!(DeepLink::parse("?t=5"), Err(SyncError::InvalidLink(_))));
    }

    #[test]
    fn test_to_url() {
        let link = DeepLink::new("abc").with_offset(Some(12.0)).with_query_key(Some("a b".to_string()));
        assert_eq!(link.to_url("https://host/"), "https://host/abc?t=12&q=a%20b");
        assert_eq!(DeepLink::parse(&link.to_url("https://host")).unwrap(), link);
        assert_eq!(DeepLink::new("abc").to_url("https://host"), "https://host/abc");
    }
}
