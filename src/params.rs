//! Query-string parameters handed to identity providers

use std::collections::HashMap;

/// Decoded query parameters of the current request
///
/// Only the first occurrence of a repeated key is kept. Empty
/// values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    /// Parse a raw (still percent-encoded) query string
    pub fn from_query(query: &str) -> Self {
        let mut values = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}
