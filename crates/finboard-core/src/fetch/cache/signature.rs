//! Request signatures and origin keys.

use sha2::{Digest, Sha256};
use url::Url;

/// Cache key for one logical request.
///
/// Derived from the normalised URL plus whether an auth key is present and
/// which header carries it. The key value itself never enters the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature {
    key: String,
    origin: String,
    normalized_url: String,
}

impl RequestSignature {
    pub fn compute(url: &Url, has_auth_key: bool, auth_header: Option<&str>) -> Self {
        let normalized_url = normalize_url(url);
        let header = auth_header.map(|h| h.trim().to_ascii_lowercase()).unwrap_or_default();
        let material = format!("{}\n{}\n{}", normalized_url, u8::from(has_auth_key), header);

        let digest = Sha256::digest(material.as_bytes());
        let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();

        Self { key: format!("sig_{}", hex), origin: origin_key(url), normalized_url }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }
}

impl std::fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Scheme + host + port, used to partition rate-limit windows.
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Drop the fragment and sort query pairs so parameter order is irrelevant.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let mut pairs: Vec<(String, String)> =
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    if pairs.is_empty() {
        normalized.set_query(None);
    } else {
        pairs.sort();
        normalized.query_pairs_mut().clear().extend_pairs(pairs.iter());
    }
    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap_or_else(|e| panic!("bad test url {s}: {e}"))
    }

    #[test]
    fn test_query_order_does_not_matter() {
        let a = RequestSignature::compute(&parse("https://api.example.com/q?symbol=AAPL&token=x"), false, None);
        let b = RequestSignature::compute(&parse("https://api.example.com/q?token=x&symbol=AAPL"), false, None);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("sig_"));
        assert_eq!(a.as_str().len(), 4 + 16);
    }

    #[test]
    fn test_auth_parameters_change_signature() {
        let url = parse("https://api.example.com/q");
        let bare = RequestSignature::compute(&url, false, None);
        let keyed = RequestSignature::compute(&url, true, Some("X-Api-Key"));
        let keyed_lower = RequestSignature::compute(&url, true, Some("x-api-key"));
        assert_ne!(bare, keyed);
        assert_eq!(keyed, keyed_lower);
    }

    #[test]
    fn test_fragment_is_ignored() {
        let a = RequestSignature::compute(&parse("https://api.example.com/q?a=1#top"), false, None);
        let b = RequestSignature::compute(&parse("https://api.example.com/q?a=1"), false, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_origin_key_includes_port() {
        assert_eq!(origin_key(&parse("http://127.0.0.1:8080/x?y=1")), "http://127.0.0.1:8080");
        assert_eq!(origin_key(&parse("https://finnhub.io/api/v1/quote")), "https://finnhub.io");
    }
}
