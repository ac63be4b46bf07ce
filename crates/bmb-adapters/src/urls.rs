//! URL validation and the canonical form used as a dedup key.

use url::{form_urlencoded, Position, Url};

/// Query parameters that only carry referral tracking.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "source",
];

/// True for absolute `http`/`https` URLs with a non-empty host, written out
/// literally as `scheme://authority...`. Whitespace or control characters
/// anywhere in the string make it invalid, and so do forms the URL standard
/// would repair (`http:host`, `https:\\host`, `https:///host`).
pub fn is_valid_url(url: Option<&str>) -> bool {
    let Some(raw) = url.filter(|s| !s.is_empty()) else {
        return false;
    };
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((scheme, rest)) = raw.split_once("://") else {
        return false;
    };
    let http_scheme = scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https");
    if !http_scheme || rest.starts_with(['/', '\\']) {
        return false;
    }
    match Url::parse(raw) {
        Ok(parsed) => parsed.host_str().is_some_and(|host| !host.is_empty()),
        Err(_) => false,
    }
}

/// Dedup key for a URL: lower-case scheme and host, trailing slashes removed
/// from the path, tracking parameters dropped. Remaining parameters keep
/// their order and encoding; path case is untouched.
///
/// Input that is not an http(s) URL is returned trimmed but otherwise as-is.
pub fn canonicalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
        _ => return trimmed.to_string(),
    };

    let mut out = String::with_capacity(trimmed.len());
    out.push_str(parsed.scheme());
    out.push_str("://");
    out.push_str(&parsed[Position::BeforeUsername..Position::AfterPort]);
    out.push_str(parsed.path().trim_end_matches('/'));

    if let Some(query) = parsed.query() {
        let kept = query
            .split('&')
            .filter(|pair| !pair.is_empty() && !is_tracking_pair(pair))
            .collect::<Vec<_>>();
        if !kept.is_empty() {
            out.push('?');
            out.push_str(&kept.join("&"));
        }
    }
    if let Some(fragment) = parsed.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn is_tracking_pair(pair: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(key, _)| {
            let key = key.to_ascii_lowercase();
            TRACKING_PARAMS.contains(&key.as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity() {
        assert!(is_valid_url(Some("http://example.com")));
        assert!(is_valid_url(Some("https://example.com/path?q=1")));
        assert!(!is_valid_url(None));
        assert!(!is_valid_url(Some("")));
        assert!(!is_valid_url(Some("   ")));
        assert!(!is_valid_url(Some("ftp://example.com")));
        assert!(!is_valid_url(Some("not-a-valid-url")));
        assert!(!is_valid_url(Some("mailto:someone@example.com")));
        assert!(!is_valid_url(Some("https://")));
        assert!(is_valid_url(Some("HTTPS://EXAMPLE.COM/Path")));
    }

    #[test]
    fn repaired_or_padded_forms_are_invalid() {
        for url in [
            "http:example.com",
            "https:\\\\c.example",
            "https:///example.com",
            "  https://b.example/x  ",
            "https://b.example/x\n",
            "https://exa\nmple.com/p",
            "https://example.com/a b",
            "https://example.com/\u{7}",
        ] {
            assert!(!is_valid_url(Some(url)), "{url:?}");
        }
    }

    #[test]
    fn removes_tracking_params_and_keeps_the_rest_in_order() {
        let url = "https://example.com/article?utm_source=twitter&z=1&utm_medium=social&a=2&ref=hn&Source=x";
        assert_eq!(canonicalize_url(url), "https://example.com/article?z=1&a=2");
    }

    #[test]
    fn lowercases_scheme_and_host_but_not_path() {
        assert_eq!(
            canonicalize_url("HTTPS://EXAMPLE.COM/Path/To"),
            "https://example.com/Path/To"
        );
    }

    #[test]
    fn trailing_slash_is_removed() {
        assert_eq!(canonicalize_url("https://example.com/"), "https://example.com");
        assert_eq!(canonicalize_url("https://example.com/a/"), "https://example.com/a");
        assert_eq!(
            canonicalize_url("https://EX.com/a/?utm_source=x&k=v"),
            "https://ex.com/a?k=v"
        );
    }

    #[test]
    fn keeps_port_credentials_and_fragment() {
        assert_eq!(
            canonicalize_url("http://user@Example.com:8080/x/?utm_term=t#Top"),
            "http://user@example.com:8080/x#Top"
        );
    }

    #[test]
    fn only_tracking_params_drops_the_query_entirely() {
        assert_eq!(
            canonicalize_url("https://example.com/a?utm_source=x&utm_campaign=y"),
            "https://example.com/a"
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for url in [
            "https://EX.com/a/?utm_source=x&k=v",
            "https://example.com/",
            "https://example.com//double//",
            "http://example.com:80/p?b=2&a=1&ref=x#frag",
            "https://example.com/caf%C3%A9?q=a+b",
            "https://example.com?",
        ] {
            let once = canonicalize_url(url);
            assert_eq!(canonicalize_url(&once), once, "{url}");
        }
    }

    #[test]
    fn superficial_differences_share_a_key() {
        let a = canonicalize_url("https://Example.com/post/?utm_source=feed");
        let b = canonicalize_url("https://example.com/post");
        assert_eq!(a, b);
    }

    #[test]
    fn non_http_input_is_passed_through_trimmed() {
        assert_eq!(canonicalize_url("  not a url "), "not a url");
    }
}
