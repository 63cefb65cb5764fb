//! Room deep links, as scanned from QR codes or shared URLs.
//!
//! Accepted forms:
//! ```text
//! https://host/matching-room/42        → Room(42)
//! https://host/rooms/42                → Room(42)
//! https://host/join?entryCode=AB12CD   → EntryCode("AB12CD")
//! https://host/anything?roomId=42      → Room(42)
//! 42                                   → Room(42)
//! AB12CD                               → EntryCode("AB12CD")
//! ```

use std::fmt;
use thiserror::Error;
use url::Url;

const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Empty room link")]
    Empty,
    #[error("No room id or entry code in link: {0}")]
    Unrecognized(String),
    #[error("Invalid base url: {0}")]
    InvalidBase(String),
}

/// Where a scanned link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomLink {
    Room(u64),
    EntryCode(String),
}

impl RoomLink {
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LinkError::Empty);
        }

        if input.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = input.parse() {
                return Ok(Self::Room(id));
            }
        }

        match Url::parse(input) {
            Ok(url) if url.has_host() => Self::from_url(&url),
            _ if is_entry_code(input) => Ok(Self::EntryCode(input.to_string())),
            _ => Err(LinkError::Unrecognized(input.to_string())),
        }
    }

    fn from_url(url: &Url) -> Result<Self, LinkError> {
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "entryCode" if is_entry_code(&value) => {
                    return Ok(Self::EntryCode(value.into_owned()));
                }
                "roomId" => {
                    if let Ok(id) = value.parse() {
                        return Ok(Self::Room(id));
                    }
                }
                _ => {}
            }
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        for pair in segments.windows(2) {
            if matches!(pair[0], "matching-room" | "rooms") {
                if let Ok(id) = pair[1].parse() {
                    return Ok(Self::Room(id));
                }
            }
        }

        Err(LinkError::Unrecognized(url.to_string()))
    }

    /// Render as a shareable link under `base`.
    pub fn to_url(&self, base: &str) -> Result<Url, LinkError> {
        let mut url = Url::parse(base).map_err(|e| LinkError::InvalidBase(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| LinkError::InvalidBase(base.to_string()))?;
            segments.pop_if_empty();
            match self {
                Self::Room(id) => {
                    segments.push("matching-room").push(&id.to_string());
                }
                Self::EntryCode(_) => {
                    segments.push("join");
                }
            }
        }
        if let Self::EntryCode(code) = self {
            url.query_pairs_mut().append_pair("entryCode", code);
        }
        Ok(url)
    }
}

impl fmt::Display for RoomLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(id) => write!(f, "room {id}"),
            Self::EntryCode(code) => write!(f, "entry code {code}"),
        }
    }
}

fn is_entry_code(s: &str) -> bool {
    (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric())
}
