//! Shared HTTP client for provider APIs
//!
//! Wraps a pooled `reqwest::Client` and normalizes responses so every
//! provider client handles transport errors the same way.

use reqwest::{Client, Method, RequestBuilder, Url};

use crate::error::{ChannelError, ChannelResult};

/// HTTP client shared by one provider client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Create a new client with reqwest's default connection pool and timeouts
    pub fn new() -> ChannelResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("babybutton/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ChannelError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Start a request
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Parse an absolute URL built from a configurable base
    pub fn url(&self, raw: &str) -> ChannelResult<Url> {
        Url::parse(raw).map_err(|e| ChannelError::InvalidConfig(format!("invalid URL {}: {}", raw, e)))
    }

    /// Send a request and read the full response body
    pub async fn execute(&self, request: RequestBuilder) -> ChannelResult<ApiResponse> {
        let response = request.send().await.map_err(ChannelError::from_reqwest)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ChannelError::HttpError(format!("Failed to read response body: {}", e))
        })?;

        if status.is_success() {
            Ok(ApiResponse::Success(body))
        } else {
            Ok(ApiResponse::Error(status.as_u16(), body))
        }
    }
}

/// Response from a provider API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    /// Successful response with body
    Success(String),
    /// Error response with status code and body
    Error(u16, String),
}

/// Append path segments to `base`, percent-encoding each one
///
/// A `/` inside a segment is encoded, so caller-supplied IDs can never
/// reach a different endpoint.
pub fn endpoint(base: &Url, segments: &[&str]) -> ChannelResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ChannelError::InvalidConfig(format!("invalid base URL {}: not a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Fallback error detail when a provider body is not in its usual shape
pub fn status_detail(code: u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("HTTP {}", code)
    } else {
        format!("HTTP {}: {}", code, body.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(ApiClient::new().is_ok());
    }

    #[test]
    fn test_status_detail() {
        assert_eq!(status_detail(502, ""), "HTTP 502");
        assert_eq!(status_detail(400, " bad \n"), "HTTP 400: bad");
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let base = Url::parse("https://discord.com/api/v10").unwrap();
        let url = endpoint(&base, &["channels", "1/../../users/@me", "messages"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://discord.com/api/v10/channels/1%2F..%2F..%2Fusers%2F@me/messages"
        );

        let root = Url::parse("http://127.0.0.1:1234/").unwrap();
        let url = endpoint(&root, &["chat.postMessage"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1234/chat.postMessage");
    }

    #[test]
    fn test_endpoint_rejects_non_base_url() {
        let base = Url::parse("mailto:bot@example.org").unwrap();
        assert!(matches!(
            endpoint(&base, &["x"]),
            Err(ChannelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_url() {
        let client = ApiClient::new().unwrap();
        assert!(matches!(
            client.url("not a url"),
            Err(ChannelError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_maps_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("nope")
            .create_async()
            .await;

        let client = ApiClient::new().unwrap();
        let url = client.url(&format!("{}/missing", server.url())).unwrap();
        let response = client.execute(client.request(Method::GET, url)).await.unwrap();

        assert_eq!(response, ApiResponse::Error(404, "nope".to_string()));
        mock.assert_async().await;
    }
}
