//! In-memory font source

use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use crate::{FetchError, FontSource};

/// Serves fonts from a URL-keyed map; unknown URLs answer 404.
/// Every requested URL is recorded.
#[derive(Debug, Default)]
pub struct MemoryFontSource {
    fonts: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<Url>>,
}

impl MemoryFontSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes for a URL
    pub fn insert(&mut self, url: &Url, bytes: Vec<u8>) {
        self.fonts.insert(url.to_string(), bytes);
    }

    /// Builder form of [`insert`](Self::insert) taking URL text
    pub fn with_font(mut self, url: &str, bytes: Vec<u8>) -> Self {
        let key = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string());
        self.fonts.insert(key, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl FontSource for MemoryFontSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.clone());
        }
        self.fonts
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}
