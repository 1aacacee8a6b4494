use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::resource::{Document, Owned};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceStatus {
    #[default]
    Active,
    Inactive,
    Closed,
}

impl PlaceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceStatus::Active => "active",
            PlaceStatus::Inactive => "inactive",
            PlaceStatus::Closed => "closed",
        }
    }
}

impl FromStr for PlaceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PlaceStatus::Active),
            "inactive" => Ok(PlaceStatus::Inactive),
            "closed" => Ok(PlaceStatus::Closed),
            other => Err(format!("Unknown place status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Category {
    pub main_category: String,
    pub sub_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    #[serde(rename = "placeid")]
    pub place_id: String,
    pub name: String,
    pub description: String,
    pub banner: String,
    pub address: String,
    pub city: String,
    pub country: String,
    #[serde(rename = "zipCode")]
    pub zip_code: String,
    pub coordinates: Coordinates,
    pub capacity: i64,
    pub phone: String,
    pub website: String,
    pub category: Category,
    #[serde(rename = "isopen")]
    pub is_open: bool,
    pub status: PlaceStatus,
    pub tags: Vec<String>,
    pub amenities: Vec<String>,
    #[serde(rename = "operatinghours")]
    pub operating_hours: Vec<String>,
    pub keywords: Vec<String>,
    #[serde(rename = "socialLinks")]
    pub social_links: BTreeMap<String, String>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "updatedBy")]
    pub updated_by: String,
    #[serde(rename = "created")]
    pub created_at: String,
    #[serde(rename = "updated")]
    pub updated_at: String,
    #[serde(rename = "deletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Document for Place {
    const COLLECTION: &'static str = "places";
    const ID_FIELD: &'static str = "placeid";
    const NAME: &'static str = "Place";
}

impl Owned for Place {
    fn owner_id(&self) -> &str {
        &self.created_by
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Closed".parse::<PlaceStatus>().unwrap(), PlaceStatus::Closed);
        assert!("renovating".parse::<PlaceStatus>().is_err());
        assert_eq!(serde_json::to_value(PlaceStatus::Inactive).unwrap(), "inactive");
    }
}
