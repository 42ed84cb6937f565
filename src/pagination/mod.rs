//! REST pagination: `per_page` on the first request, then `Link: rel="next"`
//! until it disappears.

use reqwest::header::HeaderMap;
use serde::Serialize;

/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Relations of a `Link` response header that list loops care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses an RFC 8288 `Link` header value.
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();

        for entry in header_value.split(',') {
            let mut parts = entry.split(';').map(str::trim);
            let target = match parts
                .next()
                .and_then(|p| p.strip_prefix('<'))
                .and_then(|p| p.strip_suffix('>'))
            {
                Some(target) => target.to_string(),
                None => continue,
            };
            let rel = parts
                .filter_map(|p| p.strip_prefix("rel="))
                .map(|r| r.trim_matches('"'))
                .next();

            match rel {
                Some("next") => links.next = Some(target),
                Some("last") => links.last = Some(target),
                _ => {}
            }
        }

        links
    }

    /// Reads the `Link` header of a response; empty when absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }

    /// Page count announced by the `last` link.
    pub fn total_pages(&self) -> Option<u32> {
        let last = url::Url::parse(self.last.as_deref()?).ok()?;
        last.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    }
}

/// Query parameters added to the first request of a list loop.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PaginationParams {
    per_page: u32,
}

impl PaginationParams {
    /// Largest pages GitHub serves.
    pub fn max() -> Self {
        Self {
            per_page: MAX_PER_PAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_link_header() {
        let header = r#"<https://ghe.example.com/api/v3/repositories/1/collaborators?per_page=100&page=2>; rel="next", <https://ghe.example.com/api/v3/repositories/1/collaborators?per_page=100&page=5>; rel="last""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(
            links.next.as_deref(),
            Some("https://ghe.example.com/api/v3/repositories/1/collaborators?per_page=100&page=2")
        );
        assert_eq!(links.total_pages(), Some(5));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let header = r#"<https://api.github.com/orgs/acme/teams?page=1>; rel="first", <https://api.github.com/orgs/acme/teams?page=3>; rel="prev""#;
        let links = PaginationLinks::from_header(header);

        assert_eq!(links, PaginationLinks::default());
    }

    #[test]
    fn test_ignores_malformed_entries() {
        let links = PaginationLinks::from_header(r#"garbage; rel="next", <https://x/?page=2>"#);
        assert!(links.next.is_none());
    }

    #[test]
    fn test_max_page_size() {
        assert_eq!(serde_urlencoded::to_string(PaginationParams::max()).unwrap(), "per_page=100");
    }
}
