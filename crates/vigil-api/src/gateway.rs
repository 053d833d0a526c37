// HTTP gateway
//
// Every backend call goes through `Gateway::request`: URL construction,
// bearer attachment, and classification of the response into success,
// session expiry, or HTTP failure. The resource clients in
// `crate::resources` are thin translators on top of the typed helpers.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, preview};
use crate::resources::{Alerts, Models, Threats};
use crate::session::SessionStore;
use crate::transport::TransportConfig;

/// Side effect fired when the backend rejects the session.
///
/// The gateway calls this exactly once per 401 response, after the
/// session store has been cleared. Implementations send the user to the
/// application's login entry point.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self();
    }
}

/// Redirect that only logs. Used when no login surface exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRedirect;

impl LoginRedirect for TracingRedirect {
    fn redirect_to_login(&self) {
        warn!("login required: session token was rejected");
    }
}

/// Issues requests against the backend on behalf of the resource clients.
///
/// Holds the shared `reqwest::Client`, the API base URL (e.g.
/// `http://localhost:8000/api/v1`), and the injected session store.
pub struct Gateway {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    redirect: Arc<dyn LoginRedirect>,
}

impl Gateway {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a gateway from a base URL and transport config.
    pub fn new(
        base_url: &str,
        transport: &TransportConfig,
        session: Arc<SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, session, redirect)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        session: Arc<SessionStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            session,
            redirect,
        })
    }

    /// Parse the base URL and make sure path segments can be appended.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "unsupported URL scheme '{}' (expected http or https)",
                url.scheme()
            )));
        }
        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn threats(&self) -> Threats<'_> {
        Threats::new(self)
    }

    pub fn alerts(&self) -> Alerts<'_> {
        Alerts::new(self)
    }

    pub fn models(&self) -> Models<'_> {
        Models::new(self)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL, escaping each one.
    ///
    /// `["models", "a/b", "train"]` becomes `{base}/models/a%2Fb/train`.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // The base URL was checked for cannot-be-a-base at construction.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── Request ──────────────────────────────────────────────────────

    /// Issue one request and classify the response.
    ///
    /// - 2xx → the raw response
    /// - 401 → session cleared, login redirect fired, `Error::AuthExpired`
    /// - other non-2xx → `Error::Http` (session untouched)
    /// - no response → `Error::Network`
    pub async fn request<B>(
        &self,
        method: Method,
        segments: &[&str],
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(segments);
        if params.is_empty() {
            debug!("{method} {url}");
        } else {
            debug!("{method} {url} params={params:?}");
        }

        let mut builder = self.http.request(method, url.clone());
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        // Loaded once: the request carries the token current at issue time.
        if let Some(token) = self.session.get() {
            builder = builder.header(AUTHORIZATION, bearer(&token)?);
        }

        let resp = builder.send().await.map_err(Error::Network)?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session(&url);
            return Err(Error::AuthExpired);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = preview(&body), "request failed");
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp)
    }

    fn expire_session(&self, url: &Url) {
        let had_token = self.session.clear();
        warn!(%url, had_token, "backend rejected the session; token cleared");
        self.redirect.redirect_to_login();
    }

    // ── Typed helpers ────────────────────────────────────────────────

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let resp = self
            .request(Method::GET, segments, params, None::<&()>)
            .await?;
        decode(resp).await
    }

    pub(crate) async fn send_json<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let resp = self.request(method, segments, params, body).await?;
        decode(resp).await
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn bearer(token: &SecretString) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| Error::validation(format!("invalid token header value: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Network)?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}
