use serde::{Deserialize, Serialize};

use crate::core::resource::Document;

/// Append-only log entry, owned by `username`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "activityid")]
    pub activity_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub place_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub performed_by: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    pub ip_address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_info: String,
}

impl Document for Activity {
    const COLLECTION: &'static str = "activities";
    const ID_FIELD: &'static str = "activityid";
    const NAME: &'static str = "Activity";
}
