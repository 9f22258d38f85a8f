//! Fetch strategy descriptors.
//!
//! A strategy is plain data: how to rewrite the requested URL, which header
//! set to send, and how long the sanitized body must be before the cascade
//! accepts it. The engine interprets these descriptors in order.

use rand::seq::SliceRandom;
use url::Url;

/// Desktop browser User-Agents rotated across requests.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// User-Agent sent to APIs that ask clients to identify themselves.
const BOT_USER_AGENT: &str = concat!("mailscan/", env!("CARGO_PKG_VERSION"));

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_HTML_RICH: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const SEARCH_REFERER: &str = "https://www.google.com/";
const SUBSTACK_REFERER: &str = "https://substack.com/";
const WEB_CACHE_PREFIX: &str = "https://webcache.googleusercontent.com/search?q=cache:";

/// A list of request headers.
pub type Headers = Vec<(&'static str, String)>;

/// Picks a User-Agent at random from the rotation list.
#[must_use]
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Named header sets sent with a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Plain desktop browser navigation.
    Browser,
    /// Request routed through a paywall-bypass mirror.
    MirrorProxy,
    /// Full browser navigation arriving from a search result page.
    SearchReferrer,
    /// Minimal headers for a public web-cache lookup.
    CacheMinimal,
    /// GitHub REST API asking for rendered HTML.
    GitHubApi,
    /// Browser navigation arriving from the Substack hub.
    SubstackReferrer,
}

impl HeaderProfile {
    /// Builds the header set, choosing a fresh User-Agent per call.
    #[must_use]
    pub fn headers(self) -> Headers {
        let ua = random_user_agent().to_string();
        match self {
            Self::Browser => vec![
                ("User-Agent", ua),
                ("Accept", ACCEPT_HTML.to_string()),
                ("Accept-Language", ACCEPT_LANGUAGE.to_string()),
                ("Upgrade-Insecure-Requests", "1".to_string()),
            ],
            Self::MirrorProxy => vec![
                ("User-Agent", ua),
                ("Accept", ACCEPT_HTML.to_string()),
                ("Accept-Language", ACCEPT_LANGUAGE.to_string()),
                ("Referer", SEARCH_REFERER.to_string()),
            ],
            Self::SearchReferrer => vec![
                ("User-Agent", ua),
                ("Accept", ACCEPT_HTML_RICH.to_string()),
                ("Accept-Language", ACCEPT_LANGUAGE.to_string()),
                ("Upgrade-Insecure-Requests", "1".to_string()),
                ("Sec-Fetch-Dest", "document".to_string()),
                ("Sec-Fetch-Mode", "navigate".to_string()),
                ("Sec-Fetch-Site", "cross-site".to_string()),
                ("Sec-Fetch-User", "?1".to_string()),
                ("Cache-Control", "max-age=0".to_string()),
                ("Referer", SEARCH_REFERER.to_string()),
            ],
            Self::CacheMinimal => vec![("User-Agent", ua), ("Accept", ACCEPT_HTML.to_string())],
            Self::GitHubApi => vec![
                ("User-Agent", BOT_USER_AGENT.to_string()),
                ("Accept", "application/vnd.github.html".to_string()),
            ],
            Self::SubstackReferrer => vec![
                ("User-Agent", ua),
                ("Accept", ACCEPT_HTML.to_string()),
                ("Accept-Language", ACCEPT_LANGUAGE.to_string()),
                ("Referer", SUBSTACK_REFERER.to_string()),
            ],
        }
    }
}

/// A concrete request target produced by a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// URL to fetch.
    pub url: String,
    /// Title to use instead of probing the document.
    pub title: Option<String>,
}

impl Target {
    fn plain(url: String) -> Self {
        Self { url, title: None }
    }
}

/// How a strategy derives its request URL from the article URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRewrite {
    /// Fetch the article URL as given.
    Original,
    /// Swap the host for a mirror host, keeping path and query.
    MirrorHost(&'static str),
    /// Look the article up in the public web cache.
    WebCache,
    /// Ask the GitHub API for the repository's rendered README.
    GitHubReadmeApi,
}

impl TargetRewrite {
    /// Resolves the request target, or `None` if the rewrite does not apply.
    #[must_use]
    pub fn resolve(self, url: &Url) -> Option<Target> {
        match self {
            Self::Original => Some(Target::plain(url.to_string())),
            Self::MirrorHost(host) => {
                let mut mirrored = url.clone();
                mirrored.set_host(Some(host)).ok()?;
                mirrored.set_port(None).ok()?;
                Some(Target::plain(mirrored.to_string()))
            }
            Self::WebCache => {
                let escaped: String = url::form_urlencoded::byte_serialize(url.as_str().as_bytes()).collect();
                Some(Target::plain(format!("{WEB_CACHE_PREFIX}{escaped}")))
            }
            Self::GitHubReadmeApi => {
                let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
                let owner = segments.next()?;
                let repo = segments.next()?;
                Some(Target {
                    url: format!("https://api.github.com/repos/{owner}/{repo}/readme"),
                    title: Some(format!("{owner}/{repo} README")),
                })
            }
        }
    }
}

/// One entry of a fetch cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStrategy {
    /// Short name used in logs and failure reports.
    pub label: &'static str,
    /// URL rewrite.
    pub target: TargetRewrite,
    /// Header set.
    pub headers: HeaderProfile,
    /// Minimum sanitized body length, in characters. Zero still requires a
    /// non-empty body.
    pub min_len: usize,
}

impl FetchStrategy {
    /// Creates a strategy descriptor.
    #[must_use]
    pub const fn new(
        label: &'static str,
        target: TargetRewrite,
        headers: HeaderProfile,
        min_len: usize,
    ) -> Self {
        Self {
            label,
            target,
            headers,
            min_len,
        }
    }

    /// Returns true if a body of `len` characters clears this strategy.
    #[must_use]
    pub const fn accepts(&self, len: usize) -> bool {
        len > 0 && len >= self.min_len
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mirror_host_keeps_path_and_query() {
        let target = TargetRewrite::MirrorHost("freedium.cfd")
            .resolve(&url("https://medium.com/@writer/a-post-1234?source=rss"))
            .unwrap();
        assert_eq!(target.url, "https://freedium.cfd/@writer/a-post-1234?source=rss");
        assert!(target.title.is_none());
    }

    #[test]
    fn test_mirror_host_replaces_subdomain_host() {
        let target = TargetRewrite::MirrorHost("scribe.rip")
            .resolve(&url("https://writer.medium.com/post"))
            .unwrap();
        assert_eq!(target.url, "https://scribe.rip/post");
    }

    #[test]
    fn test_web_cache_escapes_article_url() {
        let target = TargetRewrite::WebCache
            .resolve(&url("https://medium.com/p/abc?x=1"))
            .unwrap();
        assert_eq!(
            target.url,
            "https://webcache.googleusercontent.com/search?q=cache:https%3A%2F%2Fmedium.com%2Fp%2Fabc%3Fx%3D1"
        );
    }

    #[test]
    fn test_github_readme_needs_owner_and_repo() {
        let target = TargetRewrite::GitHubReadmeApi
            .resolve(&url("https://github.com/rust-lang/rust/tree/master"))
            .unwrap();
        assert_eq!(target.url, "https://api.github.com/repos/rust-lang/rust/readme");
        assert_eq!(target.title.as_deref(), Some("rust-lang/rust README"));

        assert!(
            TargetRewrite::GitHubReadmeApi
                .resolve(&url("https://github.com/rust-lang"))
                .is_none()
        );
        assert!(
            TargetRewrite::GitHubReadmeApi
                .resolve(&url("https://github.com/"))
                .is_none()
        );
    }

    #[test]
    fn test_headers_rotate_known_agents() {
        for _ in 0..20 {
            let headers = HeaderProfile::Browser.headers();
            let ua = &headers.iter().find(|(k, _)| *k == "User-Agent").unwrap().1;
            assert!(USER_AGENTS.contains(&ua.as_str()));
        }
    }

    #[test]
    fn test_no_profile_sets_accept_encoding() {
        for profile in [
            HeaderProfile::Browser,
            HeaderProfile::MirrorProxy,
            HeaderProfile::SearchReferrer,
            HeaderProfile::CacheMinimal,
            HeaderProfile::GitHubApi,
            HeaderProfile::SubstackReferrer,
        ] {
            assert!(profile.headers().iter().all(|(k, _)| *k != "Accept-Encoding"));
        }
    }

    #[test]
    fn test_search_referrer_profile() {
        let headers = HeaderProfile::SearchReferrer.headers();
        assert!(headers.contains(&("Referer", SEARCH_REFERER.to_string())));
        assert!(headers.contains(&("Sec-Fetch-Mode", "navigate".to_string())));
    }

    #[test]
    fn test_accepts_threshold() {
        let s = FetchStrategy::new("direct", TargetRewrite::Original, HeaderProfile::Browser, 200);
        assert!(!s.accepts(0));
        assert!(!s.accepts(199));
        assert!(s.accepts(200));

        let any = FetchStrategy::new("direct", TargetRewrite::Original, HeaderProfile::Browser, 0);
        assert!(!any.accepts(0));
        assert!(any.accepts(1));
    }
}
