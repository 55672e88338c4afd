//! Public URL resolution for objects in the backend's object storage.
//!
//! Resolution is computed locally the same way the backend SDK does it: no
//! request is made and no existence check is performed. A malformed key
//! simply yields whatever URL it maps to.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrlResolver {
    project_url: Url,
    bucket: String,
}

impl MediaUrlResolver {
    #[must_use]
    pub fn new(project_url: Url, bucket: impl Into<String>) -> Self {
        Self {
            project_url,
            bucket: bucket.into(),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `None` in, `None` out.
    #[must_use]
    pub fn resolve(&self, key: Option<&str>) -> Option<String> {
        key.and_then(|k| self.public_url(k))
    }

    /// `{project}/storage/v1/object/public/{bucket}/{key}`, with empty path
    /// segments in the key collapsed.
    #[must_use]
    pub fn public_url(&self, key: &str) -> Option<String> {
        let mut url = self.project_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url.path_segments_mut().ok()?;
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "object", "public", self.bucket.as_str()])
                .extend(key.split('/').filter(|s| !s.is_empty()));
        }
        Some(url.to_string())
    }

    /// Resolves every key, keeping the input order.
    #[must_use]
    pub fn resolve_all(&self, keys: &[String]) -> Vec<String> {
        keys.iter().filter_map(|k| self.public_url(k)).collect()
    }
}

/// A storage key together with the URL it resolved to.
///
/// Holds one URL per key for the lifetime of its owner; resolution runs
/// again only when the key changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    key: Option<String>,
    url: Option<String>,
}

impl ResolvedMedia {
    #[must_use]
    pub fn new(key: Option<&str>, resolver: &MediaUrlResolver) -> Self {
        Self {
            key: key.map(str::to_string),
            url: resolver.resolve(key),
        }
    }

    /// Returns `true` when the key changed and the URL was recomputed.
    pub fn sync(&mut self, key: Option<&str>, resolver: &MediaUrlResolver) -> bool {
        if self.key.as_deref() == key {
            return false;
        }
        *self = Self::new(key, resolver);
        true
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> MediaUrlResolver {
        MediaUrlResolver::new(Url::parse("https://abc.supabase.co").unwrap(), "uploads")
    }

    #[test]
    fn resolves_public_url() {
        assert_eq!(
            resolver().public_url("rentals/u1/photo.jpg").as_deref(),
            Some("https://abc.supabase.co/storage/v1/object/public/uploads/rentals/u1/photo.jpg")
        );
    }

    #[test]
    fn absent_key_resolves_to_none() {
        assert!(resolver().resolve(None).is_none());
    }

    #[test]
    fn collapses_stray_slashes() {
        assert_eq!(
            resolver().public_url("/a//b.png").as_deref(),
            Some("https://abc.supabase.co/storage/v1/object/public/uploads/a/b.png")
        );
    }

    #[test]
    fn project_url_with_trailing_slash() {
        let resolver =
            MediaUrlResolver::new(Url::parse("https://abc.supabase.co/").unwrap(), "uploads");
        assert_eq!(
            resolver.public_url("x.png").as_deref(),
            Some("https://abc.supabase.co/storage/v1/object/public/uploads/x.png")
        );
    }

    #[test]
    fn resolve_all_preserves_order() {
        let keys = vec!["c.jpg".to_string(), "a.jpg".to_string(), "b.jpg".to_string()];
        let urls = resolver().resolve_all(&keys);

        assert_eq!(urls.len(), 3);
        assert!(urls[0].ends_with("/c.jpg"));
        assert!(urls[1].ends_with("/a.jpg"));
        assert!(urls[2].ends_with("/b.jpg"));
    }

    #[test]
    fn resolved_media_only_recomputes_on_key_change() {
        let resolver = resolver();
        let mut media = ResolvedMedia::new(Some("a.jpg"), &resolver);
        let first = media.url().map(str::to_string);

        assert!(!media.sync(Some("a.jpg"), &resolver));
        assert_eq!(media.url().map(str::to_string), first);

        assert!(media.sync(Some("b.jpg"), &resolver));
        assert!(media.url().unwrap().ends_with("/b.jpg"));

        assert!(media.sync(None, &resolver));
        assert!(media.url().is_none());
        assert!(media.key().is_none());
    }
}
