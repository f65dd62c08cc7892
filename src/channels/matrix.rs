//! Matrix channel
//!
//! Talks to the homeserver's client-server API. Unlike the other channels,
//! the bot must be a member of a room before it can post there, so the
//! client keeps the set of joined rooms and joins missing ones on demand.

use async_trait::async_trait;
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info};

use crate::channels::http::{endpoint, status_detail, ApiClient, ApiResponse};
use crate::channels::r#trait::Messenger;
use crate::error::{ChannelError, ChannelResult};

/// Matrix client-server API client for one bot identity
pub struct MatrixClient {
    http: ApiClient,
    homeserver: Url,
    user_id: String,
    access_token: SecretString,
    joined: HashSet<String>,
    txn_counter: AtomicU64,
}

impl MatrixClient {
    /// Build a client without contacting the homeserver
    pub fn new(
        homeserver_url: &str,
        user_id: &str,
        access_token: SecretString,
    ) -> ChannelResult<Self> {
        let homeserver = Url::parse(homeserver_url).map_err(|e| {
            ChannelError::InvalidConfig(format!("invalid homeserver_url {}: {}", homeserver_url, e))
        })?;
        if homeserver.cannot_be_a_base() {
            return Err(ChannelError::InvalidConfig(format!(
                "invalid homeserver_url {}: not a base URL",
                homeserver_url
            )));
        }

        Ok(Self {
            http: ApiClient::new()?,
            homeserver,
            user_id: user_id.to_string(),
            access_token,
            joined: HashSet::new(),
            txn_counter: AtomicU64::new(0),
        })
    }

    /// Build a client and take a snapshot of the rooms it has already joined
    pub async fn connect(
        homeserver_url: &str,
        user_id: &str,
        access_token: SecretString,
    ) -> ChannelResult<Self> {
        let mut client = Self::new(homeserver_url, user_id, access_token)?;
        debug!(homeserver = %client.homeserver, user_id = %client.user_id, "Connecting to Matrix");

        let rooms = client.joined_rooms().await?;
        info!(user_id = %client.user_id, "Joined rooms: {:?}", rooms);
        client.joined = rooms.into_iter().collect();

        Ok(client)
    }

    pub fn is_joined(&self, room_id: &str) -> bool {
        self.joined.contains(room_id)
    }

    pub async fn joined_rooms(&self) -> ChannelResult<Vec<String>> {
        let url = self.endpoint(&["joined_rooms"])?;
        let body = self.call(self.http.request(Method::GET, url)).await?;

        let reply: JoinedRooms = serde_json::from_str(&body).map_err(|e| {
            ChannelError::HttpError(format!("Unexpected joined_rooms response: {}", e))
        })?;
        Ok(reply.joined_rooms)
    }

    pub async fn join_room(&self, room_id_or_alias: &str) -> ChannelResult<()> {
        let url = self.endpoint(&["join", room_id_or_alias])?;
        let request = self
            .http
            .request(Method::POST, url)
            .json(&serde_json::json!({}));
        self.call(request).await.map(|_| ())
    }

    /// Send an `m.text` message
    pub async fn send_text(&self, room_id: &str, text: &str) -> ChannelResult<()> {
        let txn_id = self.next_txn_id();
        let url = self.endpoint(&["rooms", room_id, "send", "m.room.message", &txn_id])?;
        let request = self.http.request(Method::PUT, url).json(&TextMessage {
            msgtype: "m.text",
            body: text,
        });
        self.call(request).await.map(|_| ())
    }

    fn next_txn_id(&self) -> String {
        format!(
            "bb{}.{}",
            chrono::Utc::now().timestamp_millis(),
            self.txn_counter.fetch_add(1, Ordering::Relaxed)
        )
    }

    /// `/_matrix/client/v3/...` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> ChannelResult<Url> {
        let prefixed: Vec<&str> = ["_matrix", "client", "v3"]
            .into_iter()
            .chain(segments.iter().copied())
            .collect();
        endpoint(&self.homeserver, &prefixed)
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> ChannelResult<String> {
        let request = request.bearer_auth(self.access_token.expose_secret());

        match self.http.execute(request).await? {
            ApiResponse::Success(body) => Ok(body),
            ApiResponse::Error(code, body) => {
                let detail = match serde_json::from_str::<MatrixError>(&body) {
                    Ok(err) => format!("{} {}: {}", code, err.errcode, err.error),
                    Err(_) => status_detail(code, &body),
                };
                Err(ChannelError::ResponseError {
                    provider: "Matrix",
                    detail,
                })
            }
        }
    }
}

#[async_trait]
impl Messenger for MatrixClient {
    /// Join the room unless it is already joined
    async fn prepare(&mut self, destination: &str) -> ChannelResult<()> {
        if self.joined.contains(destination) {
            return Ok(());
        }

        info!("Joining {}", destination);
        if let Err(e) = self.join_room(destination).await {
            error!("Error joining {}: {}", destination, e);
            return Err(ChannelError::JoinFailed {
                room: destination.to_string(),
                reason: e.to_string(),
            });
        }

        self.joined.insert(destination.to_string());
        Ok(())
    }

    async fn send(&self, destination: &str, text: &str) -> ChannelResult<()> {
        self.send_text(destination, text).await
    }
}

#[derive(Debug, Deserialize)]
struct JoinedRooms {
    #[serde(default)]
    joined_rooms: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    msgtype: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct MatrixError {
    #[serde(default)]
    errcode: String,
    #[serde(default)]
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn token() -> SecretString {
        SecretString::new("syt_token".to_string())
    }

    async fn mock_joined_rooms(server: &mut mockito::ServerGuard, rooms: &[&str]) -> mockito::Mock {
        server
            .mock("GET", "/_matrix/client/v3/joined_rooms")
            .match_header("authorization", "Bearer syt_token")
            .with_status(200)
            .with_body(json!({ "joined_rooms": rooms }).to_string())
            .create_async()
            .await
    }

    #[test]
    fn test_invalid_homeserver_url() {
        let err = MatrixClient::new("not a url", "@bot:example.org", token())
            .err()
            .unwrap();
        assert!(matches!(err, ChannelError::InvalidConfig(_)));

        assert!(MatrixClient::new("mailto:bot@example.org", "@bot:example.org", token()).is_err());
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = MatrixClient::new("https://matrix.example.org/", "@bot:example.org", token()).unwrap();
        let url = client.endpoint(&["join", "#family/room:example.org"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://matrix.example.org/_matrix/client/v3/join/%23family%2Froom:example.org"
        );
    }

    #[test]
    fn test_txn_ids_are_unique() {
        let client = MatrixClient::new("https://matrix.example.org", "@bot:example.org", token()).unwrap();
        assert_ne!(client.next_txn_id(), client.next_txn_id());
    }

    #[tokio::test]
    async fn test_connect_snapshots_joined_rooms() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_joined_rooms(&mut server, &["!a:example.org"]).await;

        let client = MatrixClient::connect(&server.url(), "@bot:example.org", token())
            .await
            .unwrap();

        assert!(client.is_joined("!a:example.org"));
        assert!(!client.is_joined("!b:example.org"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connect_fails_when_lookup_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/_matrix/client/v3/joined_rooms")
            .with_status(401)
            .with_body(r#"{"errcode":"M_UNKNOWN_TOKEN","error":"Invalid access token"}"#)
            .create_async()
            .await;

        let err = MatrixClient::connect(&server.url(), "@bot:example.org", token())
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Matrix API error: 401 M_UNKNOWN_TOKEN: Invalid access token"
        );
    }

    #[tokio::test]
    async fn test_prepare_skips_joined_room() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_joined_rooms(&mut server, &["!a:example.org"]).await;
        let join = server
            .mock("POST", Matcher::Regex(r"^/_matrix/client/v3/join/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let mut client = MatrixClient::connect(&server.url(), "@bot:example.org", token())
            .await
            .unwrap();
        assert!(client.prepare("!a:example.org").await.is_ok());

        join.assert_async().await;
    }

    #[tokio::test]
    async fn test_prepare_joins_missing_room_once() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_joined_rooms(&mut server, &[]).await;
        let join = server
            .mock("POST", "/_matrix/client/v3/join/!b:example.org")
            .match_header("authorization", "Bearer syt_token")
            .with_status(200)
            .with_body(r#"{"room_id":"!b:example.org"}"#)
            .expect(1)
            .create_async()
            .await;

        let mut client = MatrixClient::connect(&server.url(), "@bot:example.org", token())
            .await
            .unwrap();
        assert!(client.prepare("!b:example.org").await.is_ok());
        assert!(client.prepare("!b:example.org").await.is_ok());
        assert!(client.is_joined("!b:example.org"));

        join.assert_async().await;
    }

    #[tokio::test]
    async fn test_prepare_reports_join_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_joined_rooms(&mut server, &[]).await;
        let _mock = server
            .mock("POST", "/_matrix/client/v3/join/!c:example.org")
            .with_status(403)
            .with_body(r#"{"errcode":"M_FORBIDDEN","error":"You are not invited"}"#)
            .create_async()
            .await;

        let mut client = MatrixClient::connect(&server.url(), "@bot:example.org", token())
            .await
            .unwrap();
        let err = client.prepare("!c:example.org").await.unwrap_err();

        assert!(matches!(err, ChannelError::JoinFailed { ref room, .. } if room == "!c:example.org"));
        assert!(!client.is_joined("!c:example.org"));
    }

    #[tokio::test]
    async fn test_send_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = mock_joined_rooms(&mut server, &["!a:example.org"]).await;
        let send = server
            .mock(
                "PUT",
                Matcher::Regex(r"^/_matrix/client/v3/rooms/!a:example.org/send/m.room.message/bb".to_string()),
            )
            .match_body(Matcher::Json(json!({ "msgtype": "m.text", "body": "hello" })))
            .with_status(200)
            .with_body(r#"{"event_id":"$e"}"#)
            .create_async()
            .await;

        let client = MatrixClient::connect(&server.url(), "@bot:example.org", token())
            .await
            .unwrap();
        assert!(client.send("!a:example.org", "hello").await.is_ok());

        send.assert_async().await;
    }
}
