use once_cell::sync::OnceCell;
use std::collections::HashMap;
use tracing::warn;

/// A raw query string that is decoded on first access.
///
/// Keys and values are percent-decoded (`+` as space, form style). When a key repeats,
/// the last occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct QueryString {
    raw: String,
    parsed: OnceCell<HashMap<String, String>>,
}

impl QueryString {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into(), parsed: OnceCell::new() }
    }

    /// The text after `?`, undecoded.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params().get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params().len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() || self.params().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params().iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn params(&self) -> &HashMap<String, String> {
        self.parsed.get_or_init(|| match serde_urlencoded::from_str::<Vec<(String, String)>>(&self.raw) {
            Ok(pairs) => pairs.into_iter().collect(),
            Err(e) => {
                warn!(query = %self.raw, cause = %e, "can't decode query string, treat it as empty");
                HashMap::new()
            }
        })
    }
}

impl From<&str> for QueryString {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
