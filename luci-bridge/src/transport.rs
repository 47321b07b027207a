//! HTTP request/response primitive
//!
//! One trait seam between the bridge and the network so tests can run
//! against a scripted transport. The real implementation is a thin reqwest
//! wrapper that accepts the self-signed certificates router UIs ship with
//! and never follows redirects (the login POST answers 302 with the session
//! cookie context in the body).

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::TransportError;

/// Wall-clock bound applied to every outbound call.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Status and body of one HTTP exchange. Non-200 statuses are data here,
/// not errors; login needs to see 302 and 403 bodies.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Synchronous-looking request/response capability: send one request, get
/// status+body back, or a [`TransportError`] when no reply exists at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpReply, TransportError>;

    async fn post_form(
        &self,
        url: &str,
        headers: &[(String, String)],
        fields: &[(String, String)],
    ) -> Result<HttpReply, TransportError>;

    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Value,
    ) -> Result<HttpReply, TransportError>;
}

/// Production transport backed by reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<HttpReply, TransportError> {
        let exchange = async {
            let resp = req.send().await.map_err(classify)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(classify)?;
            Ok(HttpReply { status, body })
        };
        match tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), exchange).await {
            Ok(reply) => reply,
            Err(_) => Err(TransportError::Timeout(REQUEST_TIMEOUT_SECS)),
        }
    }

    fn apply_headers(
        mut req: reqwest::RequestBuilder,
        headers: &[(String, String)],
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            req = req.header(name, value);
        }
        req
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(REQUEST_TIMEOUT_SECS)
    } else {
        TransportError::Connect(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        let req = Self::apply_headers(self.client.get(url), headers);
        self.send(req).await
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(String, String)],
        fields: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        let req = Self::apply_headers(self.client.post(url), headers).form(fields);
        self.send(req).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Value,
    ) -> Result<HttpReply, TransportError> {
        let req = Self::apply_headers(self.client.post(url), headers).json(&body);
        self.send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_json_parses_body() {
        let reply = HttpReply {
            status: 200,
            body: r#"{"value": "1"}"#.to_string(),
        };
        assert!(reply.is_ok());
        assert_eq!(reply.json().unwrap()["value"], "1");
    }

    #[test]
    fn reply_json_rejects_html() {
        let reply = HttpReply {
            status: 200,
            body: "<html>login</html>".to_string(),
        };
        assert!(reply.json().is_err());
    }
}
