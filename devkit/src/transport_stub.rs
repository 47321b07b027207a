/*!
Scripted transport stub for development without a router

Replaces the reqwest-backed transport in tests. Every request is recorded
for assertions, and replies are scripted per route: queued replies play in
order, and the last one sticks for any further request on that route.
Connection failures and timeouts can be injected the same way.
*/

use async_trait::async_trait;
use luci_bridge::{HttpReply, Transport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One request as the bridge sent it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Reply(u16, String),
    ConnectFailure,
    Timeout,
}

struct Route {
    method: String,
    path: String,
    /// Extra filter on the outgoing body; lets several ubus conversations
    /// share the `/ubus/` path without relying on request ordering.
    body_contains: Option<String>,
    queue: VecDeque<Outcome>,
    last: Option<Outcome>,
}

#[derive(Default)]
struct Inner {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Scripted stand-in for [`luci_bridge::HttpTransport`].
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method` requests whose URL contains `path`.
    pub fn reply(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.script(method, path, None, Outcome::Reply(status, body.into()));
    }

    pub fn reply_json(&self, method: &str, path: &str, status: u16, body: Value) {
        self.reply(method, path, status, body.to_string());
    }

    /// Like [`Self::reply_json`], additionally filtered on the request body.
    pub fn reply_when(
        &self,
        method: &str,
        path: &str,
        body_contains: &str,
        status: u16,
        body: Value,
    ) {
        self.script(
            method,
            path,
            Some(body_contains.to_string()),
            Outcome::Reply(status, body.to_string()),
        );
    }

    /// Make the next request on this route fail like a refused connection.
    pub fn fail_connect(&self, method: &str, path: &str) {
        self.script(method, path, None, Outcome::ConnectFailure);
    }

    /// Make the next request on this route exceed the wall-clock bound.
    pub fn fail_timeout(&self, method: &str, path: &str) {
        self.script(method, path, None, Outcome::Timeout);
    }

    /// Everything the bridge sent, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().expect("request log").clone()
    }

    /// Requests whose URL contains `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(path))
            .collect()
    }

    fn script(&self, method: &str, path: &str, body_contains: Option<String>, outcome: Outcome) {
        let mut routes = self.inner.routes.lock().expect("route table");
        if let Some(route) = routes.iter_mut().find(|r| {
            r.method == method && r.path == path && r.body_contains == body_contains
        }) {
            route.queue.push_back(outcome);
            return;
        }
        let mut queue = VecDeque::new();
        queue.push_back(outcome);
        routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            body_contains,
            queue,
            last: None,
        });
    }

    fn dispatch(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        form: &[(String, String)],
        json: Option<&Value>,
    ) -> Result<HttpReply, TransportError> {
        let body_text = match json {
            Some(v) => v.to_string(),
            None => form
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&"),
        };

        self.inner
            .requests
            .lock()
            .expect("request log")
            .push(RecordedRequest {
                method: method.to_string(),
                url: url.to_string(),
                headers: headers.to_vec(),
                form: form.to_vec(),
                json: json.cloned(),
            });

        let mut routes = self.inner.routes.lock().expect("route table");
        // Most specific route wins: body filter first, then longest path.
        let best = routes
            .iter_mut()
            .filter(|r| {
                r.method == method
                    && url.contains(&r.path)
                    && r.body_contains
                        .as_ref()
                        .map(|needle| body_text.contains(needle.as_str()))
                        .unwrap_or(true)
            })
            .max_by_key(|r| (r.body_contains.is_some(), r.path.len()));

        let Some(route) = best else {
            return Err(TransportError::Connect(format!(
                "no scripted reply for {method} {url}"
            )));
        };

        let outcome = match route.queue.pop_front() {
            Some(outcome) => {
                route.last = Some(outcome.clone());
                outcome
            }
            None => route
                .last
                .clone()
                .unwrap_or(Outcome::ConnectFailure),
        };

        match outcome {
            Outcome::Reply(status, body) => {
                tracing::debug!("[MOCK] {} {} -> {}", method, url, status);
                Ok(HttpReply { status, body })
            }
            Outcome::ConnectFailure => {
                tracing::debug!("[MOCK] {} {} -> connection refused", method, url);
                Err(TransportError::Connect("connection refused".to_string()))
            }
            Outcome::Timeout => {
                tracing::debug!("[MOCK] {} {} -> timeout", method, url);
                Err(TransportError::Timeout(10))
            }
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        self.dispatch("GET", url, headers, &[], None)
    }

    async fn post_form(
        &self,
        url: &str,
        headers: &[(String, String)],
        fields: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        self.dispatch("POST", url, headers, fields, None)
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Value,
    ) -> Result<HttpReply, TransportError> {
        self.dispatch("POST", url, headers, &[], Some(&body))
    }
}
