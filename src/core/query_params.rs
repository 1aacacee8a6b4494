use std::collections::HashMap;

use crate::core::store::Filter;

/// Parse a raw query string (`a=1&b=x%20y`) into a map.
///
/// Values are URL-decoded; when a key repeats only the last value is kept.
/// A key without `=` is kept with an empty value.
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut params = HashMap::new();

    for param in query.split('&').filter(|p| !p.is_empty()) {
        let (key, encoded_value) = param.split_once('=').unwrap_or((param, ""));
        let decoded = urlencoding::decode(&encoded_value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| encoded_value.to_string());
        params.insert(key.to_string(), decoded);
    }

    params
}

/// Builds an equality filter from the allowed query keys, mapping each public
/// key to its stored field name. Empty values are ignored.
pub fn equality_filter(params: &HashMap<String, String>, allowed: &[(&str, &str)]) -> Filter {
    allowed
        .iter()
        .filter_map(|(key, field)| {
            params
                .get(*key)
                .filter(|v| !v.is_empty())
                .map(|v| (*field, v.clone()))
        })
        .fold(Filter::new(), |filter, (field, value)| filter.eq(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_values() {
        let params = parse_query_params("category=live%20music&flag&creator=u+1");

        assert_eq!(params.get("category").unwrap(), "live music");
        assert_eq!(params.get("flag").unwrap(), "");
        assert_eq!(params.get("creator").unwrap(), "u 1");
    }

    #[test]
    fn filter_only_uses_allowed_keys() {
        let params = parse_query_params("category=jazz&password=x&status=");
        let filter = equality_filter(&params, &[("category", "category"), ("status", "status")]);

        assert!(filter.matches(&json!({"category": "jazz", "password": "y"})));
        assert!(!filter.matches(&json!({"category": "rock"})));
    }
}
