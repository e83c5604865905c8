//! Page-number pagination for the contact listing.
//!
//! `?page=N` is 1-based (or `last`) and `?page_size=M` picks the window size.
//! Responses carry absolute `next`/`previous` links that keep every other
//! query parameter.

use axum::http::{header, HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use addressbook_core::defaults::{PAGE_PARAM, PAGE_SIZE, PAGE_SIZE_MAX};

use crate::ApiError;

const INVALID_PAGE: &str = "Invalid page.";

/// Requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(i64),
    Last,
}

impl PageNumber {
    /// Absent or blank means the first page. Zero, negatives and junk are
    /// a 404.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(PageNumber::Number(1));
        }
        if raw == "last" {
            return Ok(PageNumber::Last);
        }
        match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(PageNumber::Number(n)),
            _ => Err(ApiError::NotFound(INVALID_PAGE.to_string())),
        }
    }
}

/// Effective page size: default for absent, non-numeric or non-positive
/// input, clamped to the maximum.
pub fn page_size(raw: Option<&str>) -> i64 {
    match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
        Some(n) if n > 0 => n.min(PAGE_SIZE_MAX),
        _ => PAGE_SIZE,
    }
}

/// Number of pages for `count` rows. An empty listing still has one page.
pub fn page_count(count: i64, size: i64) -> i64 {
    if count <= 0 {
        1
    } else {
        (count + size - 1) / size
    }
}

/// A resolved page within a result set of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub size: i64,
    pub count: i64,
    pub page_count: i64,
}

impl PageWindow {
    pub fn resolve(page: PageNumber, size: i64, count: i64) -> Result<Self, ApiError> {
        let page_count = page_count(count, size);
        let number = match page {
            PageNumber::Last => page_count,
            PageNumber::Number(n) if n <= page_count => n,
            PageNumber::Number(_) => return Err(ApiError::NotFound(INVALID_PAGE.to_string())),
        };
        Ok(Self {
            number,
            size,
            count,
            page_count,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }

    pub fn has_next(&self) -> bool {
        self.number < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Offset for a numeric page before the total is known.
pub fn offset_for(number: i64, size: i64) -> i64 {
    (number - 1).saturating_mul(size)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Total matches across all pages
    pub count: i64,
    pub page_count: i64,
    /// Effective page size
    pub page_size: i64,
    /// 1-based
    pub current_page: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Builds absolute page links for the current request.
#[derive(Debug, Clone)]
pub struct PageLinks {
    base: String,
    path: String,
    pairs: Vec<(String, String)>,
}

impl PageLinks {
    /// `public_base_url` wins over the `Host` header.
    pub fn from_request(
        public_base_url: Option<&str>,
        headers: &HeaderMap,
        uri: &Uri,
        pairs: &[(String, String)],
    ) -> Self {
        let base = match public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let host = headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .or_else(|| uri.authority().map(|a| a.as_str()))
                    .unwrap_or("localhost");
                format!("http://{}", host)
            }
        };
        Self {
            base,
            path: uri.path().to_string(),
            pairs: pairs.to_vec(),
        }
    }

    /// URL for `page`. `None` drops the page parameter.
    pub fn url(&self, page: Option<i64>) -> String {
        let mut pairs: Vec<(&str, String)> = self
            .pairs
            .iter()
            .filter(|(k, _)| k != PAGE_PARAM)
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        if let Some(page) = page {
            pairs.push((PAGE_PARAM, page.to_string()));
        }
        // Stable: repeated keys keep their relative order
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        if query.is_empty() {
            format!("{}{}", self.base, self.path)
        } else {
            format!("{}{}?{}", self.base, self.path, query)
        }
    }

    pub fn meta(&self, window: &PageWindow) -> PaginationMeta {
        let next = window.has_next().then(|| self.url(Some(window.number + 1)));
        let previous = window.has_previous().then(|| {
            if window.number == 2 {
                self.url(None)
            } else {
                self.url(Some(window.number - 1))
            }
        });
        PaginationMeta {
            count: window.count,
            page_count: window.page_count,
            page_size: window.size,
            current_page: window.number,
            next,
            previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn links(query: &[(&str, &str)]) -> PageLinks {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.test:8000"));
        let uri: Uri = "/api/contacts/".parse().unwrap();
        PageLinks::from_request(None, &headers, &uri, &pairs(query))
    }

    #[test]
    fn test_page_number_parse() {
        assert_eq!(PageNumber::parse(None).unwrap(), PageNumber::Number(1));
        assert_eq!(PageNumber::parse(Some("3")).unwrap(), PageNumber::Number(3));
        assert_eq!(PageNumber::parse(Some("last")).unwrap(), PageNumber::Last);
        assert_eq!(PageNumber::parse(Some("")).unwrap(), PageNumber::Number(1));
        for bad in ["0", "-1", "abc", "1.5"] {
            assert!(
                matches!(PageNumber::parse(Some(bad)), Err(ApiError::NotFound(ref m)) if m == INVALID_PAGE),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_page_size_rules() {
        assert_eq!(page_size(None), 20);
        assert_eq!(page_size(Some("5")), 5);
        assert_eq!(page_size(Some("500")), 100);
        assert_eq!(page_size(Some("0")), 20);
        assert_eq!(page_size(Some("-3")), 20);
        assert_eq!(page_size(Some("ten")), 20);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(45, 10), 5);
    }

    #[test]
    fn test_window_resolution() {
        let window = PageWindow::resolve(PageNumber::Number(2), 10, 45).unwrap();
        assert_eq!(window.offset(), 10);
        assert!(window.has_next());
        assert!(window.has_previous());

        let last = PageWindow::resolve(PageNumber::Last, 10, 45).unwrap();
        assert_eq!(last.number, 5);
        assert!(!last.has_next());

        let empty = PageWindow::resolve(PageNumber::Number(1), 20, 0).unwrap();
        assert_eq!(empty.page_count, 1);
        assert!(!empty.has_next() && !empty.has_previous());

        assert!(PageWindow::resolve(PageNumber::Number(6), 10, 45).is_err());
        assert!(PageWindow::resolve(PageNumber::Number(2), 20, 0).is_err());
    }

    #[test]
    fn test_links_replace_page_and_keep_other_params() {
        let links = links(&[("search", "kim lee"), ("page", "2"), ("page_size", "10")]);
        let window = PageWindow::resolve(PageNumber::Number(2), 10, 45).unwrap();
        let meta = links.meta(&window);

        assert_eq!(
            meta.next.as_deref(),
            Some("http://api.test:8000/api/contacts/?page=3&page_size=10&search=kim%20lee")
        );
        // Previous of page 2 drops the page parameter entirely
        assert_eq!(
            meta.previous.as_deref(),
            Some("http://api.test:8000/api/contacts/?page_size=10&search=kim%20lee")
        );
        assert_eq!(meta.page_size, 10);
        assert_eq!(meta.current_page, 2);
    }

    #[test]
    fn test_links_repeated_keys_keep_order() {
        let links = links(&[("labels", "3"), ("labels", "1")]);
        assert_eq!(
            links.url(Some(2)),
            "http://api.test:8000/api/contacts/?labels=3&labels=1&page=2"
        );
    }

    #[test]
    fn test_first_page_has_no_previous() {
        let window = PageWindow::resolve(PageNumber::Number(1), 20, 25).unwrap();
        let meta = links(&[]).meta(&window);
        assert!(meta.previous.is_none());
        assert_eq!(
            meta.next.as_deref(),
            Some("http://api.test:8000/api/contacts/?page=2")
        );
    }

    #[test]
    fn test_public_base_url_wins() {
        let uri: Uri = "/api/contacts/".parse().unwrap();
        let links = PageLinks::from_request(
            Some("https://contacts.example.com/"),
            &HeaderMap::new(),
            &uri,
            &[],
        );
        assert_eq!(links.url(None), "https://contacts.example.com/api/contacts/");
    }
}
