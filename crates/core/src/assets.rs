//! Public URLs for stored event files.

/// Turns a stored file key into a URL clients can fetch.
pub trait AssetUrlResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Option<String>;
}

/// Joins keys onto a CDN base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnUrlResolver {
    base_url: String,
}

impl CdnUrlResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

impl AssetUrlResolver for CdnUrlResolver {
    fn resolve(&self, key: &str) -> Option<String> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        if key.starts_with("http://") || key.starts_with("https://") {
            return Some(key.to_string());
        }
        Some(format!("{}/{}", self.base_url, key.trim_start_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_key_onto_base() {
        let resolver = CdnUrlResolver::new("https://cdn.example.com/assets/");
        assert_eq!(
            resolver.resolve("/events/1/flyer.pdf").as_deref(),
            Some("https://cdn.example.com/assets/events/1/flyer.pdf")
        );
    }

    #[test]
    fn blank_key_has_no_url() {
        let resolver = CdnUrlResolver::new("https://cdn.example.com");
        assert_eq!(resolver.resolve("  "), None);
    }

    #[test]
    fn absolute_urls_pass_through() {
        let resolver = CdnUrlResolver::new("https://cdn.example.com");
        assert_eq!(
            resolver.resolve("https://elsewhere.test/a.pdf").as_deref(),
            Some("https://elsewhere.test/a.pdf")
        );
    }
}
