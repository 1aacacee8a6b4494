//! Request bodies for mutating resource routes.
//!
//! The web client posts `multipart/form-data`; API clients may send a JSON
//! object instead. Both end up as a [`FormData`]: text fields keyed by name
//! plus any uploaded files.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::http::header::{self, HeaderMap};
use actix_web::web::{self, Bytes, BytesMut};
use futures_util::{StreamExt, TryStreamExt};
use serde_json::Value;

use crate::config::{MAX_JSON_BYTES, MAX_UPLOAD_BYTES};
use crate::core::errors::ApiError;

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Bytes>,
}

impl FormData {
    pub async fn read(headers: &HeaderMap, payload: web::Payload) -> Result<Self, ApiError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            Self::from_multipart(Multipart::new(headers, payload)).await
        } else {
            let body = read_limited(payload, MAX_JSON_BYTES).await?;
            Self::from_json_bytes(&body)
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        let mut total = 0usize;

        while let Some(mut field) = multipart
            .try_next()
            .await
            .map_err(|e| ApiError::bad_request(format!("Unable to parse form: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let is_file = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .is_some();

            let mut data = BytesMut::new();
            while let Some(chunk) = field
                .try_next()
                .await
                .map_err(|e| ApiError::bad_request(format!("Unable to read form field: {}", e)))?
            {
                total += chunk.len();
                if total > MAX_UPLOAD_BYTES {
                    return Err(ApiError::bad_request("Upload too large"));
                }
                data.extend_from_slice(&chunk);
            }

            if is_file {
                if !data.is_empty() {
                    form.files.insert(name, data.freeze());
                }
            } else {
                let text = String::from_utf8(data.to_vec())
                    .map_err(|_| ApiError::bad_request(format!("Field {} is not valid UTF-8", name)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    pub fn from_json_bytes(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value =
            serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid input"))?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self, ApiError> {
        let Value::Object(map) = value else {
            return Err(ApiError::bad_request("Expected a JSON object"));
        };

        let fields = map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect();

        Ok(Self {
            fields,
            files: HashMap::new(),
        })
    }

    /// Fills in fields from an embedded JSON object (e.g. a legacy `event`
    /// field). Explicit fields win.
    pub fn merge_embedded(&mut self, key: &str) -> Result<(), ApiError> {
        let Some(raw) = self.fields.remove(key) else {
            return Ok(());
        };

        let embedded = Self::from_json_bytes(raw.as_bytes())?;
        for (k, v) in embedded.fields {
            self.fields.entry(k).or_insert(v);
        }
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Present field, sanitized to plain text.
    pub fn clean(&self, key: &str) -> Option<String> {
        self.text(key).map(crate::core::helpers::sanitize_text)
    }

    pub fn required(&self, key: &str) -> Result<String, ApiError> {
        self.clean(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("{} is required", key)))
    }

    pub fn number(&self, key: &str) -> Result<Option<f64>, ApiError> {
        self.text(key)
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ApiError::bad_request(format!("Invalid {} value", key)))
            })
            .transpose()
    }

    pub fn integer(&self, key: &str) -> Result<Option<i64>, ApiError> {
        self.text(key)
            .map(|v| {
                v.trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::bad_request(format!("Invalid {} value", key)))
            })
            .transpose()
    }

    pub fn boolean(&self, key: &str) -> Result<Option<bool>, ApiError> {
        self.text(key)
            .map(|v| match v.trim() {
                "true" | "1" | "on" => Ok(true),
                "false" | "0" | "off" | "" => Ok(false),
                _ => Err(ApiError::bad_request(format!("Invalid {} value", key))),
            })
            .transpose()
    }

    /// List field given either as a JSON array or comma separated.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.text(key).map(|raw| {
            serde_json::from_str::<Vec<String>>(raw)
                .unwrap_or_else(|_| raw.split(',').map(str::to_string).collect())
                .iter()
                .map(|item| crate::core::helpers::sanitize_text(item))
                .filter(|item| !item.is_empty())
                .collect()
        })
    }

    /// Field holding a JSON value (object, array, ...).
    pub fn json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        self.text(key)
            .map(|raw| {
                serde_json::from_str(raw)
                    .map_err(|_| ApiError::bad_request(format!("Invalid {} value", key)))
            })
            .transpose()
    }

    /// First uploaded file found under any of `keys`.
    pub fn file(&self, keys: &[&str]) -> Option<&Bytes> {
        keys.iter().find_map(|key| self.files.get(*key))
    }
}

pub async fn read_limited(mut payload: web::Payload, limit: usize) -> Result<Bytes, ApiError> {
    let mut body = BytesMut::new();

    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ApiError::bad_request(format!("Unable to read body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(ApiError::bad_request("Request body too large"));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_values_become_fields() {
        let form = FormData::from_json(serde_json::json!({
            "title": "Gig",
            "capacity": 300,
            "tags": ["jazz", "late"],
            "website": null
        }))
        .unwrap();

        assert_eq!(form.text("title"), Some("Gig"));
        assert_eq!(form.integer("capacity").unwrap(), Some(300));
        assert_eq!(form.list("tags").unwrap(), vec!["jazz", "late"]);
        assert!(!form.has("website"));
        assert!(!form.has("location"));
    }

    #[test]
    fn embedded_object_fills_missing_fields() {
        let mut form = FormData::from_json(serde_json::json!({
            "event": "{\"title\":\"Old\",\"location\":\"Hall\"}",
            "title": "New"
        }))
        .unwrap();

        form.merge_embedded("event").unwrap();

        assert_eq!(form.text("title"), Some("New"));
        assert_eq!(form.text("location"), Some("Hall"));
        assert!(!form.has("event"));
    }

    #[test]
    fn numbers_are_validated() {
        let form = FormData::from_json(serde_json::json!({"price": "ten", "quantity": "3"})).unwrap();

        assert!(form.number("price").is_err());
        assert_eq!(form.integer("quantity").unwrap(), Some(3));
        assert_eq!(form.number("missing").unwrap(), None);
    }

    #[test]
    fn comma_separated_lists() {
        let form = FormData::from_json(serde_json::json!({"amenities": "wifi, bar,,stage"})).unwrap();

        assert_eq!(form.list("amenities").unwrap(), vec!["wifi", "bar", "stage"]);
    }

    #[test]
    fn empty_body_is_an_empty_form() {
        let form = FormData::from_json_bytes(b"  ").unwrap();

        assert!(!form.has("anything"));
        assert!(FormData::from_json_bytes(b"[1,2]").is_err());
    }
}
