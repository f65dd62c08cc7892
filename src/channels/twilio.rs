//! Twilio SMS channel

use async_trait::async_trait;
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::channels::http::{endpoint, status_detail, ApiClient, ApiResponse};
use crate::channels::r#trait::Messenger;
use crate::error::{ChannelError, ChannelResult};

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio Messages API client, sending from a fixed number
pub struct TwilioClient {
    http: ApiClient,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    base_url: String,
}

impl TwilioClient {
    pub fn new(
        account_sid: &str,
        auth_token: SecretString,
        from_number: &str,
    ) -> ChannelResult<Self> {
        Ok(Self {
            http: ApiClient::new()?,
            account_sid: account_sid.to_string(),
            auth_token,
            from_number: from_number.to_string(),
            base_url: TWILIO_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Create one outbound message
    pub async fn create_message(&self, to: &str, body: &str) -> ChannelResult<()> {
        let url = self.messages_url()?;

        let request = self
            .http
            .request(Method::POST, url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("From", self.from_number.as_str()), ("To", to), ("Body", body)]);

        match self.http.execute(request).await? {
            ApiResponse::Success(_) => Ok(()),
            ApiResponse::Error(code, body) => {
                let detail = match serde_json::from_str::<TwilioError>(&body) {
                    Ok(err) => match err.code {
                        Some(twilio_code) => format!("{} (code {})", err.message, twilio_code),
                        None => err.message,
                    },
                    Err(_) => status_detail(code, &body),
                };
                Err(ChannelError::ResponseError {
                    provider: "Twilio",
                    detail,
                })
            }
        }
    }

    fn messages_url(&self) -> ChannelResult<Url> {
        let base = self.http.url(&self.base_url)?;
        endpoint(
            &base,
            &["2010-04-01", "Accounts", self.account_sid.as_str(), "Messages.json"],
        )
    }
}

#[async_trait]
impl Messenger for TwilioClient {
    async fn send(&self, destination: &str, text: &str) -> ChannelResult<()> {
        self.create_message(destination, text).await
    }
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: String,
    #[serde(default)]
    code: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> TwilioClient {
        TwilioClient::new("AC123", SecretString::new("secret".to_string()), "+15550000")
            .unwrap()
            .with_base_url(&server.url())
    }

    #[tokio::test]
    async fn test_create_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            // base64("AC123:secret")
            .match_header("authorization", "Basic QUMxMjM6c2VjcmV0")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("From".into(), "+15550000".into()),
                Matcher::UrlEncoded("To".into(), "+15550100".into()),
                Matcher::UrlEncoded("Body".into(), "It's a boy 👶".into()),
            ]))
            .with_status(201)
            .with_body(r#"{"sid":"SM1","status":"queued"}"#)
            .create_async()
            .await;

        let result = client(&server).send("+15550100", "It's a boy 👶").await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[test]
    fn test_account_sid_stays_in_its_segment() {
        let client = TwilioClient::new("AC1/../../evil", SecretString::new("secret".to_string()), "+15550000")
            .unwrap();
        assert_eq!(
            client.messages_url().unwrap().as_str(),
            "https://api.twilio.com/2010-04-01/Accounts/AC1%2F..%2F..%2Fevil/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_error_carries_twilio_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .with_status(400)
            .with_body(r#"{"code":21211,"message":"The 'To' number is not valid.","status":400}"#)
            .create_async()
            .await;

        let err = client(&server).send("bogus", "hi").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Twilio API error: The 'To' number is not valid. (code 21211)"
        );
    }
}
