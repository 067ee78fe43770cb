//! OSC 8 hyperlink registry
//!
//! Cells carry a small id instead of the URI. Ids are never reused, so a
//! retained row whose URI has been dropped resolves to nothing rather than
//! to a different link.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct Hyperlinks {
    uris: HashMap<u32, String>,
    ids: HashMap<String, u32>,
    last_id: u32,
}

impl Hyperlinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `uri`, registering it on first use
    pub fn intern(&mut self, uri: &str) -> u32 {
        if let Some(&id) = self.ids.get(uri) {
            return id;
        }
        self.last_id = self.last_id.wrapping_add(1).max(1);
        let id = self.last_id;
        self.uris.insert(id, uri.to_string());
        self.ids.insert(uri.to_string(), id);
        id
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.uris.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Forget every id not in `live`. Returns how many were dropped.
    pub fn retain(&mut self, live: &HashSet<u32>) -> usize {
        let before = self.uris.len();
        self.uris.retain(|id, _| live.contains(id));
        self.ids.retain(|_, id| live.contains(id));
        before - self.uris.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyperlinks_intern_dedupes() {
        let mut links = Hyperlinks::new();
        let a = links.intern("https://a");
        let b = links.intern("https://b");
        assert_ne!(a, b);
        assert_eq!(links.intern("https://a"), a);
        assert_eq!(links.get(b), Some("https://b"));
        assert_eq!(links.get(0), None);
    }

    #[test]
    fn test_hyperlinks_retain_never_reuses_ids() {
        let mut links = Hyperlinks::new();
        let a = links.intern("https://a");
        let b = links.intern("https://b");
        assert_eq!(links.retain(&HashSet::from([b])), 1);
        assert_eq!(links.get(a), None);
        assert_eq!(links.len(), 1);

        let again = links.intern("https://a");
        assert_ne!(again, a);
        assert_ne!(again, b);
    }
}
