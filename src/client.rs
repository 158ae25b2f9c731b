//! Session-authenticated HTTP access to the catalog site
//!
//! One [`KinozalClient`] per process owns the cookie-bearing session. Every
//! authenticated operation re-runs [`KinozalClient::ensure_authenticated`]
//! instead of trusting a cached success — the site's sessions are
//! short-lived. Page bytes are decoded via the content-type charset (the
//! site historically serves windows-1251) with UTF-8 as the documented
//! fallback; only the binary descriptor path hands out raw bytes.

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_8};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use url::Url;

/// The only content type accepted for a descriptor download
pub const TORRENT_MIME: &str = "application/x-bittorrent";

/// Session cookie holding the user id
const UID_COOKIE: &str = "uid";
/// Session cookie holding the password hash
const PASS_COOKIE: &str = "pass";

// The site rejects requests that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Pick the decoder declared by a content-type header.
///
/// The strategy is deliberately small: honor a declared `charset` parameter
/// when `encoding_rs` knows the label, otherwise decode as UTF-8. No further
/// guessing.
pub fn encoding_for(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches('"'))
    })
}

/// Cookie-bearing session state, exclusively owned by the client
struct Session {
    last_login: Option<Instant>,
}

/// Authenticated HTTP client for the catalog site
pub struct KinozalClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    download_base_url: Url,
    config: TrackerConfig,
    session: Mutex<Session>,
}

impl KinozalClient {
    /// Build a client from tracker configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid tracker base URL: {e}"),
            key: Some("tracker.base_url".to_string()),
        })?;
        let download_base_url =
            Url::parse(&config.download_base_url).map_err(|e| Error::Config {
                message: format!("invalid descriptor base URL: {e}"),
                key: Some("tracker.download_base_url".to_string()),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(BROWSER_USER_AGENT),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
        );

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            http,
            jar,
            base_url,
            download_base_url,
            config,
            session: Mutex::new(Session { last_login: None }),
        })
    }

    /// When the session last completed a login, if ever.
    pub fn last_authenticated(&self) -> Option<Instant> {
        self.lock_session().last_login
    }

    /// Names of the cookies currently held for the site.
    fn cookie_names(&self) -> Vec<String> {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return Vec::new();
        };
        let Ok(text) = header.to_str() else {
            return Vec::new();
        };
        text.split(';')
            .filter_map(|pair| pair.split('=').next())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn has_session_cookies(&self) -> bool {
        let names = self.cookie_names();
        names.iter().any(|n| n == UID_COOKIE) && names.iter().any(|n| n == PASS_COOKIE)
    }

    /// Log in unless the jar already carries both session cookies.
    ///
    /// Concurrent callers may both run the login sequence; the site accepts
    /// repeated logins for the same account and the jar just gets the same
    /// cookies twice.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if self.has_session_cookies() {
            return Ok(());
        }
        self.login().await
    }

    /// Run the full login sequence: GET the site root for baseline cookies,
    /// then POST credentials to the login endpoint.
    ///
    /// Success requires both the user-id and password-hash cookies in the
    /// jar afterwards; anything less is an authentication failure, not a
    /// partial success.
    async fn login(&self) -> Result<()> {
        tracing::debug!(url = %self.base_url, "starting tracker login");

        self.http.get(self.base_url.clone()).send().await?;

        let login_url = self.endpoint_url(&self.config.endpoints.login)?;
        let response = self
            .http
            .post(login_url)
            .header(header::REFERER, self.base_url.as_str())
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
                ("returnto", "/"),
            ])
            .send()
            .await?;
        let status = response.status().as_u16();

        if !self.has_session_cookies() {
            let cookies = self.cookie_names();
            tracing::warn!(status, ?cookies, "tracker login failed");
            return Err(Error::Authentication { status, cookies });
        }

        self.lock_session().last_login = Some(Instant::now());
        tracing::info!("logged in to tracker");
        Ok(())
    }

    /// Fetch the search page for a free-text query, decoded to text.
    pub async fn search_page(&self, query: &str) -> Result<String> {
        let mut url = self.endpoint_url(&self.config.endpoints.search)?;
        url.query_pairs_mut().append_pair("s", query);
        self.fetch_page(url).await
    }

    /// URL of a release's detail page.
    pub fn detail_url(&self, release_id: &str) -> Result<Url> {
        let mut url = self.endpoint_url(&self.config.endpoints.details)?;
        url.query_pairs_mut().append_pair("id", release_id);
        Ok(url)
    }

    /// Fetch a release's detail page, decoded to text.
    pub async fn detail_page(&self, release_id: &str) -> Result<String> {
        let url = self.detail_url(release_id)?;
        self.fetch_page(url).await
    }

    /// Fetch the hash fragment the site serves separately from the detail
    /// page (fixed `action=2` request), decoded to text.
    pub async fn hash_fragment(&self, release_id: &str) -> Result<String> {
        let mut url = self.endpoint_url(&self.config.endpoints.hash)?;
        url.query_pairs_mut()
            .append_pair("id", release_id)
            .append_pair("action", "2");
        self.fetch_page(url).await
    }

    /// Fetch the binary torrent descriptor for a release.
    ///
    /// The response must declare the torrent MIME type; anything else (most
    /// commonly a login page after the site silently dropped the session) is
    /// a hard download error with no automatic retry.
    pub async fn fetch_descriptor(&self, release_id: &str) -> Result<Vec<u8>> {
        self.ensure_authenticated().await?;

        let mut url = self
            .download_base_url
            .join(&self.config.endpoints.download)
            .map_err(|e| Error::Config {
                message: format!("invalid download endpoint: {e}"),
                key: Some("tracker.endpoints.download".to_string()),
            })?;
        url.query_pairs_mut().append_pair("id", release_id);

        let referer = self.detail_url(release_id)?;
        let response = self
            .http
            .get(url)
            .header(header::REFERER, referer.as_str())
            .send()
            .await?
            .error_for_status()?;

        let content_type = header_str(response.headers(), header::CONTENT_TYPE);
        if !content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(TORRENT_MIME))
        {
            return Err(Error::Download {
                release_id: release_id.to_string(),
                reason: format!(
                    "expected {TORRENT_MIME}, got {}",
                    content_type.as_deref().unwrap_or("no content type")
                ),
            });
        }

        let data = response.bytes().await?;
        if data.is_empty() {
            return Err(Error::Download {
                release_id: release_id.to_string(),
                reason: "empty descriptor body".to_string(),
            });
        }

        tracing::debug!(release_id, bytes = data.len(), "descriptor fetched");
        Ok(data.to_vec())
    }

    /// Authenticated GET returning decoded text.
    async fn fetch_page(&self, url: Url) -> Result<String> {
        self.ensure_authenticated().await?;

        let response = self
            .http
            .get(url)
            .header(header::REFERER, self.base_url.as_str())
            .send()
            .await?
            .error_for_status()?;

        let content_type = header_str(response.headers(), header::CONTENT_TYPE);
        let bytes = response.bytes().await?;
        let (text, _, _) = encoding_for(content_type.as_deref()).decode(&bytes);
        Ok(text.into_owned())
    }

    fn endpoint_url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| Error::Config {
            message: format!("invalid endpoint path {path}: {e}"),
            key: Some("tracker.endpoints".to_string()),
        })
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Session> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
