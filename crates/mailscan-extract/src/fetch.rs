//! HTTP fetch capability.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::FetchError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Bytes of the body searched for a `<meta>` charset declaration.
const META_SNIFF_LEN: usize = 1024;

static META_CHARSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:-]+)"#).ok()
});

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Total time allowed for one request, body included.
    pub timeout: Duration,
    /// Redirects followed before the request fails.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Raw response handed back to the extraction engine.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code.
    pub status: u16,
    /// Response body after transparent decompression.
    pub body: Bytes,
    /// `Content-Encoding` still present on the response, if any.
    pub content_encoding: Option<String>,
    /// `Content-Type` of the response, if any.
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// Returns the encoding the body is still wrapped in, ignoring `identity`.
    #[must_use]
    pub fn undecoded_encoding(&self) -> Option<&str> {
        self.content_encoding
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty() && !e.eq_ignore_ascii_case("identity"))
    }

    /// Character encoding of the body: a byte order mark, then the
    /// `Content-Type` charset, then a `<meta>` declaration near the top of
    /// the document, then UTF-8.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        if let Some((bom, _)) = Encoding::for_bom(&self.body) {
            return bom;
        }
        self.content_type
            .as_deref()
            .and_then(content_type_charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .or_else(|| meta_charset(&self.body))
            .unwrap_or(UTF_8)
    }

    /// Decodes the body, replacing malformed sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        self.encoding().decode_with_bom_removal(&self.body).0
    }
}

fn content_type_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
    })
}

/// A `<meta>` charset naming UTF-16 is read as UTF-8, since the
/// declaration itself was readable as ASCII.
fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_LEN)];
    let captures = META_CHARSET.as_ref()?.captures(head)?;
    Encoding::for_label(captures.get(1)?.as_bytes()).map(Encoding::output_encoding)
}

/// Performs a single HTTP GET.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` with the given request headers.
    ///
    /// Non-200 responses are returned, not treated as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or body read fails.
    async fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<FetchedPage, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<FetchedPage, FetchError> {
        (**self).get(url, headers).await
    }
}

/// [`PageFetcher`] backed by `reqwest`.
///
/// gzip, deflate and brotli bodies are decompressed by the client, which
/// also advertises them in `Accept-Encoding`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher from the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

fn header_map(headers: &[(&'static str, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!(header = *name, "Skipping invalid header"),
        }
    }
    map
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &str, headers: &[(&'static str, String)]) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(header_map(headers))
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        debug!(url, status, len = body.len(), "Fetched page");

        Ok(FetchedPage {
            status,
            body,
            content_encoding,
            content_type,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::strategy::HeaderProfile;

    fn page(encoding: Option<&str>) -> FetchedPage {
        FetchedPage {
            status: 200,
            body: Bytes::from_static(b"<p>x</p>"),
            content_encoding: encoding.map(str::to_string),
            content_type: None,
        }
    }

    fn html(body: &'static [u8], content_type: Option<&str>) -> FetchedPage {
        FetchedPage {
            status: 200,
            body: Bytes::from_static(body),
            content_encoding: None,
            content_type: content_type.map(str::to_string),
        }
    }

    #[test]
    fn test_undecoded_encoding() {
        assert_eq!(page(None).undecoded_encoding(), None);
        assert_eq!(page(Some("identity")).undecoded_encoding(), None);
        assert_eq!(page(Some("")).undecoded_encoding(), None);
        assert_eq!(page(Some("gzip")).undecoded_encoding(), Some("gzip"));
    }

    #[test]
    fn test_text_uses_content_type_charset() {
        let latin1 = html(b"<p>caf\xe9</p>", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(latin1.text(), "<p>caf\u{e9}</p>");

        let quoted = html(b"<p>caf\xe9</p>", Some(r#"text/html;charset="windows-1252""#));
        assert_eq!(quoted.text(), "<p>caf\u{e9}</p>");
    }

    #[test]
    fn test_text_sniffs_meta_charset() {
        let meta = html(
            b"<html><head><meta charset=\"iso-8859-1\"></head><body>na\xefve</body></html>",
            Some("text/html"),
        );
        assert_eq!(meta.encoding(), encoding_rs::WINDOWS_1252);
        assert!(meta.text().contains("na\u{ef}ve"));

        let http_equiv = html(
            b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1251\"><p>\xcf\xf0\xe8</p>",
            None,
        );
        assert!(http_equiv.text().contains("\u{41f}\u{440}\u{438}"));

        let utf16 = html(b"<meta charset=\"utf-16\"><p>x</p>", None);
        assert_eq!(utf16.encoding(), UTF_8);
    }

    #[test]
    fn test_text_defaults_to_utf8() {
        let plain = html("<p>caf\u{e9}</p>".as_bytes(), None);
        assert_eq!(plain.encoding(), UTF_8);
        assert_eq!(plain.text(), "<p>caf\u{e9}</p>");

        let bom = html(b"\xef\xbb\xbf<p>x</p>", Some("text/html; charset=iso-8859-1"));
        assert_eq!(bom.text(), "<p>x</p>");

        let unknown = html(b"<p>x</p>", Some("text/html; charset=klingon"));
        assert_eq!(unknown.encoding(), UTF_8);
    }

    #[test]
    fn test_every_profile_header_converts() {
        for profile in [
            HeaderProfile::Browser,
            HeaderProfile::MirrorProxy,
            HeaderProfile::SearchReferrer,
            HeaderProfile::CacheMinimal,
            HeaderProfile::GitHubApi,
            HeaderProfile::SubstackReferrer,
        ] {
            let headers = profile.headers();
            assert_eq!(header_map(&headers).len(), headers.len());
        }
    }

    #[test]
    fn test_build_client() {
        assert!(HttpFetcher::new(&FetchConfig::default()).is_ok());
    }
}
