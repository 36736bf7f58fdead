//! Push gateway client.
//!
//! Speaks the Expo push API: a POST of a JSON array of messages, answered with
//! one ticket per message in request order.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use wayfarer_common::config::AppConfig;
use wayfarer_common::types::{NotificationData, QueueItem};

use crate::error::NotifierError;

/// Ticket error code for a token the provider no longer recognises.
pub const DEVICE_NOT_REGISTERED: &str = "DeviceNotRegistered";

/// One outbound message in the gateway's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: NotificationData,
    pub sound: String,
    pub priority: String,
    pub channel_id: String,
}

impl PushMessage {
    /// Translate a queue row. Total and pure: the payload is passed through as-is.
    pub fn from_item(item: &QueueItem) -> Self {
        Self {
            to: item.token.clone(),
            title: item.title.clone(),
            body: item.body.clone(),
            data: item.data.clone(),
            sound: "default".to_string(),
            priority: "high".to_string(),
            channel_id: "default".to_string(),
        }
    }
}

/// Extra error information attached to a failed ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-message delivery outcome, positionally matched to the submitted chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PushTicket {
    Ok {
        #[serde(default)]
        id: Option<String>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        details: Option<TicketDetails>,
    },
}

impl PushTicket {
    /// The destination token is permanently invalid and must not be retried.
    pub fn is_device_not_registered(&self) -> bool {
        self.error_code() == Some(DEVICE_NOT_REGISTERED)
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            PushTicket::Error {
                details: Some(details),
                ..
            } => details.error.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    data: Vec<PushTicket>,
}

/// Anything that can deliver one chunk of messages and hand back its tickets.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, NotifierError>;
}

/// HTTP client for an Expo-compatible push endpoint.
#[derive(Clone)]
pub struct ExpoPushClient {
    client: reqwest::Client,
    url: String,
    access_token: Option<String>,
}

impl ExpoPushClient {
    pub fn new(
        url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wayfarer-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            access_token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, NotifierError> {
        Self::new(
            config.push_gateway_url.clone(),
            config.push_access_token.clone(),
            Duration::from_secs(config.push_request_timeout_secs),
        )
    }
}

#[async_trait]
impl PushGateway for ExpoPushClient {
    async fn send(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, NotifierError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(messages);

        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PushResponse = response.json().await?;
        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(token: &str) -> PushMessage {
        let mut data = NotificationData::new();
        data.insert("type".to_string(), json!("like"));
        data.insert("postId".to_string(), json!("p-1"));
        PushMessage {
            to: token.to_string(),
            title: "New like".to_string(),
            body: "Someone liked your post".to_string(),
            data,
            sound: "default".to_string(),
            priority: "high".to_string(),
            channel_id: "default".to_string(),
        }
    }

    fn client(server: &MockServer, token: Option<&str>) -> ExpoPushClient {
        ExpoPushClient::new(
            format!("{}/--/api/v2/push/send", server.uri()),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_from_item_sets_delivery_hints() {
        let item = QueueItem {
            id: Uuid::new_v4(),
            token: "ExponentPushToken[abc]".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            data: NotificationData::new(),
            sent: false,
            created_at: Utc::now(),
        };
        let msg = PushMessage::from_item(&item);
        assert_eq!(msg.to, "ExponentPushToken[abc]");
        assert_eq!(msg.sound, "default");
        assert_eq!(msg.priority, "high");
        assert_eq!(msg.channel_id, "default");
    }

    #[test]
    fn test_message_wire_shape() {
        let value = serde_json::to_value(message("tok")).unwrap();
        assert_eq!(
            value,
            json!({
                "to": "tok",
                "title": "New like",
                "body": "Someone liked your post",
                "data": { "type": "like", "postId": "p-1" },
                "sound": "default",
                "priority": "high",
                "channelId": "default"
            })
        );
    }

    #[test]
    fn test_payload_key_order_preserved() {
        let raw = serde_json::to_string(&message("tok")).unwrap();
        let type_pos = raw.find("\"type\"").unwrap();
        let post_pos = raw.find("\"postId\"").unwrap();
        assert!(type_pos < post_pos);
    }

    #[test]
    fn test_ticket_parsing() {
        let tickets: Vec<PushTicket> = serde_json::from_value(json!([
            { "status": "ok", "id": "XXXX-1" },
            { "status": "error", "message": "gone", "details": { "error": "DeviceNotRegistered" } },
            { "status": "error", "details": { "error": "MessageTooBig" } },
            { "status": "error" }
        ]))
        .unwrap();

        assert_eq!(
            tickets[0],
            PushTicket::Ok {
                id: Some("XXXX-1".to_string())
            }
        );
        assert!(tickets[1].is_device_not_registered());
        assert!(!tickets[2].is_device_not_registered());
        assert_eq!(tickets[2].error_code(), Some("MessageTooBig"));
        assert_eq!(tickets[3].error_code(), None);
    }

    #[tokio::test]
    async fn test_send_posts_array_and_returns_tickets() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/--/api/v2/push/send"))
            .and(header("accept", "application/json"))
            .and(body_json(json!([serde_json::to_value(message("t1")).unwrap()])))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [{ "status": "ok", "id": "abc" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tickets = client(&server, None).send(&[message("t1")]).await.unwrap();
        assert_eq!(
            tickets,
            vec![PushTicket::Ok {
                id: Some("abc".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn test_send_uses_bearer_token_when_configured() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "status": "ok" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tickets = client(&server, Some("secret"))
            .send(&[message("t1")])
            .await
            .unwrap();
        assert_eq!(tickets.len(), 1);
    }

    #[tokio::test]
    async fn test_send_non_success_is_gateway_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .send(&[message("t1")])
            .await
            .unwrap_err();
        match err {
            NotifierError::Gateway { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
