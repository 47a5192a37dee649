//! Same-origin guard for state-changing requests.

use axum::http::{header, HeaderMap};
use url::Url;

/// Configured origins allowed to issue state-changing requests.
///
/// Entries are trimmed and stored without a trailing slash.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = entries
            .into_iter()
            .map(|s| strip_trailing_slash(s.as_ref().trim()).to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { origins }
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    fn contains(&self, origin: &str) -> bool {
        let origin = strip_trailing_slash(origin);
        self.origins.iter().any(|o| o == origin)
    }
}

/// The origins a request claims or implies.
///
/// Missing or malformed values are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginCandidates {
    /// Raw `Origin` header. The opaque value `null` counts as absent.
    pub origin: String,
    /// Origin parsed out of the `Referer` header.
    pub referer: String,
    /// Origin of the request's own URL (scheme + host).
    pub request: String,
}

impl OriginCandidates {
    /// Derive candidates from request headers.
    ///
    /// The request's own scheme comes from `X-Forwarded-Proto` (default
    /// `http`) and its host from the `Host` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let origin = match header_str(headers, header::ORIGIN).trim() {
            "null" => String::new(),
            raw => raw.to_string(),
        };
        let referer = origin_of_url(header_str(headers, header::REFERER).trim());

        let scheme = header_str(headers, "x-forwarded-proto")
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("http");
        let host = header_str(headers, header::HOST).trim();
        let request = if host.is_empty() {
            String::new()
        } else {
            origin_of_url(&format!("{scheme}://{host}"))
        };

        Self {
            origin,
            referer,
            request,
        }
    }

    fn header_derived(&self) -> impl Iterator<Item = &str> {
        [self.origin.as_str(), self.referer.as_str()]
            .into_iter()
            .filter(|c| !c.is_empty())
    }
}

/// Decide whether a request is same-origin.
///
/// Without an allowlist every header-derived origin must equal the request's
/// own origin, and at least one must be present. With an allowlist any of the
/// three candidates matching an entry is enough.
pub fn is_same_origin(candidates: &OriginCandidates, allowed: &AllowedOrigins) -> bool {
    if allowed.is_empty() {
        if candidates.request.is_empty() {
            return false;
        }
        let mut seen = false;
        for candidate in candidates.header_derived() {
            if strip_trailing_slash(candidate) != candidates.request {
                return false;
            }
            seen = true;
        }
        return seen;
    }

    candidates
        .header_derived()
        .chain(std::iter::once(candidates.request.as_str()))
        .filter(|c| !c.is_empty())
        .any(|c| allowed.contains(c))
}

/// `scheme://host[:port]` of a URL, or empty when it does not parse or its
/// origin is opaque.
fn origin_of_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match Url::parse(raw) {
        Ok(url) if url.has_host() => {
            let origin = url.origin();
            if origin.is_tuple() {
                origin.ascii_serialization()
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

fn header_str<K: header::AsHeaderName>(headers: &HeaderMap, name: K) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn strip_trailing_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_candidates_from_headers() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "https://site.dev"),
            ("referer", "https://site.dev/blog/new?draft=1"),
            ("host", "api.site.dev"),
            ("x-forwarded-proto", "https"),
        ]));
        assert_eq!(c.origin, "https://site.dev");
        assert_eq!(c.referer, "https://site.dev");
        assert_eq!(c.request, "https://api.site.dev");
    }

    #[test]
    fn test_default_port_dropped_from_request_origin() {
        let c = OriginCandidates::from_headers(&headers(&[("host", "site.dev:80")]));
        assert_eq!(c.request, "http://site.dev");
    }

    #[test]
    fn test_malformed_referer_treated_as_absent() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("referer", "not a url"),
            ("host", "site.dev"),
        ]));
        assert_eq!(c.referer, "");
    }

    #[test]
    fn test_opaque_origins_treated_as_absent() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "null"),
            ("referer", "foo://site.dev/page"),
            ("host", "site.dev"),
            ("x-forwarded-proto", "foo"),
        ]));
        assert_eq!(c, OriginCandidates::default());
        assert!(!is_same_origin(&c, &AllowedOrigins::default()));
    }

    #[test]
    fn test_null_origin_rejected_against_real_request_origin() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "null"),
            ("host", "site.dev"),
        ]));
        assert_eq!(c.origin, "");
        assert_eq!(c.request, "http://site.dev");
        assert!(!is_same_origin(&c, &AllowedOrigins::default()));
        assert!(!is_same_origin(&c, &AllowedOrigins::new(["null"])));
    }

    #[test]
    fn test_default_deny_cross_origin() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "https://evil.com"),
            ("host", "site.dev"),
            ("x-forwarded-proto", "https"),
        ]));
        assert!(!is_same_origin(&c, &AllowedOrigins::default()));
    }

    #[test]
    fn test_default_accepts_same_origin() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "https://site.dev"),
            ("referer", "https://site.dev/admin"),
            ("host", "site.dev"),
            ("x-forwarded-proto", "https"),
        ]));
        assert!(is_same_origin(&c, &AllowedOrigins::default()));
    }

    #[test]
    fn test_default_rejects_mismatched_referer() {
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "https://site.dev"),
            ("referer", "https://evil.com/page"),
            ("host", "site.dev"),
            ("x-forwarded-proto", "https"),
        ]));
        assert!(!is_same_origin(&c, &AllowedOrigins::default()));
    }

    #[test]
    fn test_default_rejects_without_origin_headers() {
        let c = OriginCandidates::from_headers(&headers(&[("host", "site.dev")]));
        assert!(!is_same_origin(&c, &AllowedOrigins::default()));
    }

    #[test]
    fn test_allowlist_accepts_listed_origin_regardless_of_host() {
        let allowed = AllowedOrigins::new(["https://a.com"]);
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "https://a.com"),
            ("host", "internal.backend:8080"),
        ]));
        assert!(is_same_origin(&c, &allowed));
    }

    #[test]
    fn test_allowlist_matches_referer_and_trailing_slash() {
        let allowed = AllowedOrigins::new([" https://a.com/ ", ""]);
        let c = OriginCandidates::from_headers(&headers(&[
            ("referer", "https://a.com/contact"),
            ("host", "internal.backend"),
        ]));
        assert!(is_same_origin(&c, &allowed));
    }

    #[test]
    fn test_allowlist_rejects_unlisted() {
        let allowed = AllowedOrigins::new(["https://a.com"]);
        let c = OriginCandidates::from_headers(&headers(&[
            ("origin", "https://b.com"),
            ("host", "internal.backend"),
        ]));
        assert!(!is_same_origin(&c, &allowed));
    }
}
