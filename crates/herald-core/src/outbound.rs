//! Rendered outbound message — shared between the scheduler engine
//! (which produces one per delivery) and the Telegram adapter (which
//! turns it into Bot API calls).

use serde::{Deserialize, Serialize};

/// A fully rendered message, ready for the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outbound {
    /// Target chat ID.
    pub destination: i64,
    /// Message text (or caption when media is attached).
    pub body: String,
    /// Previously-uploaded media to re-send, if any.
    pub media: Option<MediaRef>,
    /// Inline URL buttons, one per keyboard row. May be empty.
    pub buttons: Vec<Button>,
}

/// Reference to a media object already uploaded to the chat platform.
///
/// The bot never stores media bytes — only the platform's opaque file
/// reference captured when the operator sent the photo/video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    /// Opaque file reference (Telegram `file_id`).
    pub file_ref: String,
    /// Opaque access token tied to the upload (Telegram `file_unique_id`).
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// An inline URL button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub url: String,
}
