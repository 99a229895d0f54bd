use std::time::Duration;

use leptos::window;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

/// Fallback for dev builds served outside the marketplace host.
const DEFAULT_BASE: &str = "http://localhost:80/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("Server returned {0}")]
    Status(StatusCode),
}

impl ApiError {
    /// A 401 means the stored token went stale; the shell drops the session.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Status(StatusCode::UNAUTHORIZED))
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: Url, token: Option<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base,
            token,
        }
    }

    /// Client with its base taken from the page location.
    pub fn from_window(token: Option<String>) -> Self {
        let base = window()
            .location()
            .origin()
            .ok()
            .and_then(|origin| Url::parse(&format!("{origin}/")).ok())
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE).expect("default base url"));
        Self::new(base, token)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let response = self
            .authorize(self.http.get(url))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let response = self
            .authorize(self.http.post(url))
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Absolute and `data:` URLs pass through; server-relative paths are
    /// resolved against the API host.
    pub fn full_image_url(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
        {
            return path.to_owned();
        }
        match self.base.join(path.trim_start_matches('/')) {
            Ok(url) => url.to_string(),
            Err(_) => path.to_owned(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response.json().await?)
    }
}
