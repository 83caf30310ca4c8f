//! HTTP client for the Listmonk API and media downloads
//!
//! API calls return the status and body of every response the server sends;
//! only transport-level failures are errors. Binary downloads are softer still:
//! any failure yields `None` so that one broken asset never aborts a run.

use crate::config::{ApiConfig, HttpConfig};
use crate::error::{Error, Result};
use crate::types::{RemoteRecord, Resource};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

/// User agent sent with every request
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ListmonkBackup/1.0)";

/// Characters of a failed download's body kept for diagnostics
const DIAGNOSTIC_BODY_CHARS: usize = 200;

/// Status and parsed body of an API response
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body; `None` when the body was empty or not JSON
    pub body: Option<Value>,
}

impl ApiResponse {
    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated client for one Listmonk installation
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Build a client from the API credentials and timeout settings
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the underlying HTTP client cannot be created
    pub fn new(api: &ApiConfig, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout)
            .connect_timeout(http.connect_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http: client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            username: api.username.clone(),
            password: api.password.clone(),
        })
    }

    /// Full URL of an API endpoint
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Issue an authenticated request with URL-encoded query parameters
    ///
    /// Non-2xx responses are returned normally; callers check [`ApiResponse::status`].
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse> {
        let request = self
            .http
            .request(method.clone(), self.endpoint_url(endpoint))
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(query);

        debug!(%method, endpoint, "calling API");
        let response = request.send().await?;
        Self::into_api_response(response).await
    }

    /// Issue an authenticated request carrying a JSON payload (POST/PUT)
    pub async fn call_with_body(
        &self,
        method: Method,
        endpoint: &str,
        body: &Value,
    ) -> Result<ApiResponse> {
        debug!(%method, endpoint, "calling API with body");
        let response = self
            .http
            .request(method, self.endpoint_url(endpoint))
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;
        Self::into_api_response(response).await
    }

    async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };
        Ok(ApiResponse { status, body })
    }

    /// Fetch every record of a collection resource
    ///
    /// # Errors
    /// - [`Error::Transport`] on connection failure
    /// - [`Error::Status`] on a non-2xx response
    /// - [`Error::UnexpectedShape`] when the body does not match the resource's shape
    pub async fn fetch_collection(&self, resource: Resource) -> Result<Vec<RemoteRecord>> {
        let endpoint = resource.endpoint();
        let response = self
            .call(Method::GET, endpoint, &[("per_page", "all")])
            .await?;

        if !response.is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                status: response.status,
            });
        }

        resource.shape().extract(endpoint, response.body.as_ref())
    }

    /// Create a subscriber from a JSON record
    pub async fn create_subscriber(&self, subscriber: &Value) -> Result<ApiResponse> {
        self.call_with_body(Method::POST, Resource::Subscribers.endpoint(), subscriber)
            .await
    }

    /// Download a file, following redirects
    ///
    /// Each path segment of `url` is percent-encoded first, so file names with spaces
    /// or special characters can be fetched. Returns `None` on a malformed URL, a
    /// transport failure, or any status other than 200.
    pub async fn download_binary(&self, url: &str) -> Option<Vec<u8>> {
        let Some(encoded) = encode_url_path(url) else {
            warn!(url, "download failed: malformed URL");
            return None;
        };

        let response = match self.http.get(&encoded).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %encoded, error = %e, "download failed");
                return None;
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(DIAGNOSTIC_BODY_CHARS).collect();
            warn!(
                url = %encoded,
                status = status.as_u16(),
                response = %snippet,
                "download failed"
            );
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!(url = %encoded, error = %e, "download failed while reading body");
                None
            }
        }
    }
}

/// Percent-encode every path segment of an absolute URL
///
/// Segments are decoded first so an already-encoded URL is not double-encoded.
/// Query strings are kept verbatim; fragments are dropped.
///
/// ```
/// use listmonk_backup::client::encode_url_path;
///
/// assert_eq!(
///     encode_url_path("https://cdn.example.com/uploads/my file (1).png").as_deref(),
///     Some("https://cdn.example.com/uploads/my%20file%20%281%29.png")
/// );
/// ```
pub fn encode_url_path(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }

    let rest = rest.split('#').next().unwrap_or_default();
    let (before_query, query) = match rest.split_once('?') {
        Some((before, query)) => (before, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = match before_query.find('/') {
        Some(idx) => before_query.split_at(idx),
        None => (before_query, ""),
    };
    if authority.is_empty() {
        return None;
    }

    let encoded_path = path
        .split('/')
        .map(|segment| {
            let decoded = urlencoding::decode(segment)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            urlencoding::encode(&decoded).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/");

    let mut encoded = format!("{scheme}://{authority}{encoded_path}");
    if let Some(query) = query {
        encoded.push('?');
        encoded.push_str(query);
    }

    url::Url::parse(&encoded).ok().map(|_| encoded)
}
