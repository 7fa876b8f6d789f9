use async_trait::async_trait;
use log::{ debug, error };
use reqwest::Client as HttpClient;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde_json::Value as JsonValue;
use url::Url;
use super::{ AssistantReply, GatewayError, MessageGateway };
use crate::models::auth::Credentials;

const QUEST_ROUTE: &str = "api/quest";
const HISTORY_CREATE_ROUTE: &str = "api/hist-create";
const LOGIN_ROUTE: &str = "api/login";
const REGISTER_ROUTE: &str = "api/register";

#[derive(Serialize)]
struct QuestRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct HistoryCreateRequest<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: HttpClient,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_client(base_url, HttpClient::new())
    }

    pub fn with_client(base_url: &str, http: HttpClient) -> Result<Self, GatewayError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|e|
            GatewayError::InvalidUrl(format!("{}: {}", base_url, e))
        )?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url, GatewayError> {
        self.base_url.join(route).map_err(|e| GatewayError::InvalidUrl(e.to_string()))
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        route: &str,
        payload: Option<&T>,
        credentials: Option<&Credentials>
    ) -> Result<AssistantReply, GatewayError> {
        let url = self.endpoint(route)?;
        debug!("POST {}", url);

        let mut req = self.http.post(url.clone());
        if let Some(body) = payload {
            req = req.json(body);
        }
        if let Some(creds) = credentials {
            req = req.header(AUTHORIZATION, creds.authorization_header());
        }

        let resp = req.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            GatewayError::from(e)
        })?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            let message = error_message(&raw)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "request failed".to_string());
            error!("Request to {} returned {}: {}", url, status, message);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(AssistantReply::from_body(&raw))
    }
}

fn error_message(raw: &str) -> Option<String> {
    let body: JsonValue = serde_json::from_str(raw).ok()?;
    ["detail", "message"]
        .iter()
        .find_map(|field| body.get(*field).and_then(JsonValue::as_str))
        .map(str::to_string)
}

#[async_trait]
impl MessageGateway for HttpGateway {
    async fn send(
        &self,
        content: &str,
        credentials: Option<&Credentials>
    ) -> Result<AssistantReply, GatewayError> {
        let req = QuestRequest { text: content };
        self.post(QUEST_ROUTE, Some(&req), credentials).await
    }

    async fn create_history(
        &self,
        title: &str,
        credentials: Option<&Credentials>
    ) -> Result<AssistantReply, GatewayError> {
        let req = HistoryCreateRequest { title };
        self.post(HISTORY_CREATE_ROUTE, Some(&req), credentials).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AssistantReply, GatewayError> {
        self.post::<JsonValue>(LOGIN_ROUTE, None, Some(credentials)).await
    }

    async fn register(&self, credentials: &Credentials) -> Result<AssistantReply, GatewayError> {
        let req = RegisterRequest {
            username: &credentials.email,
            password: &credentials.password,
        };
        self.post(REGISTER_ROUTE, Some(&req), None).await
    }
}
