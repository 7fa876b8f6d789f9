pub mod http;

use crate::cli::Args;
use crate::models::auth::Credentials;
use async_trait::async_trait;
use log::info;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use self::http::HttpGateway;

/// String fields checked, in order, when turning a structured reply into text.
const CONTENT_FIELDS: [&str; 4] = ["answer", "text", "response", "detail"];

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request failed: {status} - {message}")]
    Status {
        status: u16,
        message: String,
    },
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) =>
                GatewayError::Status {
                    status: status.as_u16(),
                    message: err.to_string(),
                },
            None => GatewayError::Transport(err.to_string()),
        }
    }
}

/// Decoded response body of a gateway call. The shape is not fixed; callers
/// decide how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub body: JsonValue,
}

impl AssistantReply {
    pub fn new(body: JsonValue) -> Self {
        Self { body }
    }

    /// Decodes JSON bodies; anything else is kept as a plain string.
    pub fn from_body(raw: &str) -> Self {
        let body = serde_json
            ::from_str::<JsonValue>(raw)
            .unwrap_or_else(|_| JsonValue::String(raw.to_string()));
        Self { body }
    }

    /// Text to store as a bot message.
    pub fn into_content(self) -> String {
        match self.body {
            JsonValue::String(text) => text,
            JsonValue::Object(ref map) => {
                CONTENT_FIELDS.iter()
                    .find_map(|field| map.get(*field).and_then(JsonValue::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| self.body.to_string())
            }
            other => other.to_string(),
        }
    }
}

/// Remote assistant API boundary. Every call is a single round trip with no
/// retry and no deduplication.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(
        &self,
        content: &str,
        credentials: Option<&Credentials>
    ) -> Result<AssistantReply, GatewayError>;

    async fn create_history(
        &self,
        title: &str,
        credentials: Option<&Credentials>
    ) -> Result<AssistantReply, GatewayError>;

    async fn login(&self, credentials: &Credentials) -> Result<AssistantReply, GatewayError>;

    async fn register(&self, credentials: &Credentials) -> Result<AssistantReply, GatewayError>;
}

pub fn new_gateway(args: &Args) -> Result<Arc<dyn MessageGateway>, GatewayError> {
    let gateway = HttpGateway::new(&args.base_url)?;
    info!("Assistant gateway configured: BaseURL={}", gateway.base_url());
    Ok(Arc::new(gateway))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_body_is_kept_verbatim() {
        let reply = AssistantReply::from_body("ipsum dolor sit amet lorem");
        assert_eq!(reply.body, JsonValue::String("ipsum dolor sit amet lorem".into()));
        assert_eq!(reply.into_content(), "ipsum dolor sit amet lorem");
    }

    #[test]
    fn json_string_body_is_unquoted() {
        assert_eq!(AssistantReply::from_body("\"hello\"").into_content(), "hello");
    }

    #[test]
    fn object_body_prefers_known_text_fields() {
        let reply = AssistantReply::new(json!({ "answer": "42", "text": "ignored" }));
        assert_eq!(reply.into_content(), "42");

        let reply = AssistantReply::new(json!({ "detail": "ok" }));
        assert_eq!(reply.into_content(), "ok");
    }

    #[test]
    fn unknown_shape_falls_back_to_json_text() {
        let reply = AssistantReply::new(json!({ "items": [1, 2] }));
        assert_eq!(reply.into_content(), "{\"items\":[1,2]}");

        let reply = AssistantReply::new(json!(7));
        assert_eq!(reply.into_content(), "7");
    }

    #[test]
    fn status_error_message_is_readable() {
        let err = GatewayError::Status { status: 401, message: "Unauthorized".into() };
        assert_eq!(err.to_string(), "Request failed: 401 - Unauthorized");
    }
}
