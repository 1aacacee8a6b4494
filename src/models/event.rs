use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::resource::{Document, Owned};
use crate::models::{Media, Merch, Ticket};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "eventid")]
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub place: String,
    pub date: String,
    pub location: String,
    #[serde(rename = "creatorid")]
    pub creator_id: String,
    pub organizer_name: String,
    pub organizer_contact: String,
    pub tickets: Vec<Ticket>,
    pub media: Vec<Media>,
    pub merch: Vec<Merch>,
    pub start_date_time: String,
    pub end_date_time: String,
    pub category: String,
    pub banner_image: String,
    pub website_url: String,
    pub status: String,
    pub accessibility_info: String,
    pub reviews: Vec<Review>,
    pub social_media_links: Vec<String>,
    pub tags: Vec<String>,
    pub custom_fields: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document for Event {
    const COLLECTION: &'static str = "events";
    const ID_FIELD: &'static str = "eventid";
    const NAME: &'static str = "Event";
}

impl Owned for Event {
    fn owner_id(&self) -> &str {
        &self.creator_id
    }
}

/// Embedded in [`Event::reviews`]; not addressable on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    #[serde(rename = "reviewid")]
    pub review_id: String,
    #[serde(rename = "eventid")]
    pub event_id: String,
    #[serde(rename = "userid")]
    pub user_id: String,
    pub rating: i64,
    pub comment: String,
    pub date: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_default_to_empty_arrays() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "eventid": "ev1",
            "title": "Gig",
            "creatorid": "u1"
        }))
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        for key in ["tickets", "media", "merch", "reviews", "tags"] {
            assert_eq!(json[key], serde_json::json!([]), "{} should be an empty array", key);
        }
        assert_eq!(event.owner_id(), "u1");
    }
}
