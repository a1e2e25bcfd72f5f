use anyhow::Context;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

/// Thin HTTP client for the gateway's external endpoints.
pub struct GatewayClient {
    http: reqwest::Client,
    base: Url,
    user: Option<String>,
}

/// Status plus decoded body. Non-JSON bodies are kept as a string value.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: StatusCode,
    pub body: Value,
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.body.get("result").and_then(Value::as_bool).unwrap_or(true)
    }

    pub fn message(&self) -> &str {
        self.body
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| self.body.as_str())
            .unwrap_or_default()
    }
}

impl GatewayClient {
    pub fn new(server: &str, user: Option<String>) -> anyhow::Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            user,
        })
    }

    pub fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("cannot join '{}' onto {}", path, self.base))
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<GatewayReply> {
        let request = self.with_user(self.http.get(self.endpoint(path)?));
        Self::send(request).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<GatewayReply> {
        let request = self.with_user(self.http.post(self.endpoint(path)?).json(body));
        Self::send(request).await
    }

    fn with_user(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.user {
            Some(user) => request.header("User", user),
            None => request,
        }
    }

    async fn send(request: reqwest::RequestBuilder) -> anyhow::Result<GatewayReply> {
        let response = request.send().await.context("request to gateway failed")?;
        let status = response.status();
        let text = response.text().await.context("failed to read gateway response")?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(GatewayReply { status, body })
    }
}
