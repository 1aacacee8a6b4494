use serde::{Deserialize, Serialize};

use crate::core::resource::Document;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Photo360,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "photo360" => Some(MediaKind::Photo360),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    pub id: String,
    #[serde(rename = "eventid")]
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub caption: String,
    pub description: String,
    #[serde(rename = "creatorid")]
    pub creator_id: String,
    pub created_at: String,
}

impl Document for Media {
    const COLLECTION: &'static str = "media";
    const ID_FIELD: &'static str = "id";
    const NAME: &'static str = "Media";
}
