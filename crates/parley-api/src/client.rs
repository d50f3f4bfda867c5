use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, SessionError};
use crate::session::SessionStore;

/// Authenticated client for the REST collaborator.
///
/// Cloning is cheap: the connection pool and session are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self::with_http(Client::new(), base_url, session)
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        session: SessionStore,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(http, base_url, session))
    }

    pub fn with_http(http: Client, base_url: impl Into<String>, session: SessionStore) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    /// Same pool and session, different collaborator host.
    pub fn rebased(&self, base_url: impl Into<String>) -> Self {
        Self::with_http(self.http.clone(), base_url, self.session.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request carrying the session token.
    pub(crate) fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self.session.token().ok_or(SessionError::Missing)?;
        Ok(self.with_bearer(method, path, &token))
    }

    pub(crate) fn with_bearer(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
    }

    pub(crate) fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = dispatch(self.authorized(Method::GET, path)?).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Authenticated request with a JSON body whose response is ignored.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        dispatch(self.authorized(method, path)?.json(body)).await?;
        Ok(())
    }

    /// Authenticated request without a body whose response is ignored.
    pub(crate) async fn execute(&self, method: Method, path: &str) -> Result<(), ApiError> {
        dispatch(self.authorized(method, path)?).await?;
        Ok(())
    }
}

/// Send a request and return the raw body of a successful response.
pub(crate) async fn dispatch(request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
    let resp = request.send().await?;

    let status = resp.status();
    let url = resp.url().path().to_string();
    let body = resp.bytes().await?;

    if status.is_success() {
        debug!("{} -> {}", url, status);
        return Ok(body.to_vec());
    }

    let err = ApiError::from_response(status, &body);
    warn!("{} -> {}: {}", url, status, err);
    Err(err)
}
