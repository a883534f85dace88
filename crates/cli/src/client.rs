//! Thin HTTP client over the expensegate API.

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// Non-success response from the server, carrying its JSON (or raw) body.
#[derive(Debug, thiserror::Error)]
#[error("request failed with {status}: {body}")]
pub struct ApiFailure {
    pub status: StatusCode,
    pub body: String,
}

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

impl LoginResponse {
    pub fn from_json(body: &Value) -> Result<Self> {
        Self::deserialize(body).context("unexpected login response")
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        let req = self
            .request(Method::POST, "/login", None)
            .json(&json!({ "username": username, "password": password }));
        send(req).await
    }

    pub async fn logout(&self, token: &str) -> Result<Value> {
        send(self.request(Method::POST, "/logout", Some(token))).await
    }

    pub async fn my_expenses(&self, token: &str) -> Result<Value> {
        send(self.request(Method::GET, "/expenses/me", Some(token))).await
    }

    pub async fn my_expense(&self, token: &str, id: &str) -> Result<Value> {
        let path = format!("/expenses/me/{id}");
        send(self.request(Method::GET, &path, Some(token))).await
    }

    pub async fn create(
        &self,
        token: &str,
        title: &str,
        description: &str,
        amount: f64,
    ) -> Result<Value> {
        let req = self.request(Method::POST, "/expenses", Some(token)).json(&json!({
            "title": title,
            "description": description,
            "amount": amount,
        }));
        send(req).await
    }

    pub async fn submit(&self, token: &str, id: &str) -> Result<Value> {
        let path = format!("/expenses/submit/{id}");
        send(self.request(Method::POST, &path, Some(token))).await
    }

    pub async fn delete(&self, token: &str, id: &str) -> Result<Value> {
        let path = format!("/expenses/delete/{id}");
        send(self.request(Method::DELETE, &path, Some(token))).await
    }

    pub async fn approvals(&self, token: &str) -> Result<Value> {
        send(self.request(Method::GET, "/expenses/approvals/me", Some(token))).await
    }

    pub async fn approval(&self, token: &str, id: &str) -> Result<Value> {
        let path = format!("/expenses/approvals/me/{id}");
        send(self.request(Method::GET, &path, Some(token))).await
    }

    pub async fn approve(&self, token: &str, id: &str) -> Result<Value> {
        let path = format!("/expenses/approve/{id}");
        send(self.request(Method::POST, &path, Some(token))).await
    }

    pub async fn reject(&self, token: &str, id: &str, reason: &str) -> Result<Value> {
        let path = format!("/expenses/reject/{id}");
        let req = self
            .request(Method::POST, &path, Some(token))
            .json(&json!({ "rejection_reason": reason }));
        send(req).await
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "sending request");
        let req = self.http.request(method, url);
        match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

async fn send(req: RequestBuilder) -> Result<Value> {
    let res = req.send().await.context("failed to reach the expensegate server")?;
    let status = res.status();
    let body = res.text().await.context("failed to read response body")?;

    if !status.is_success() {
        return Err(ApiFailure { status, body }.into());
    }

    serde_json::from_str(&body).with_context(|| format!("server returned non-JSON body: {body}"))
}
