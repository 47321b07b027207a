//! Switches and buttons
//!
//! A switch write is not a single call on LuCI: the uci option is staged
//! with `uci set`, checked with `uci changes`, then committed through the
//! apply_rollback/confirm pair the web UI uses. Buttons are one-shot:
//! reboot, bounce a named interface, or submit a preconfigured form.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::entities::{self, ButtonAction, SwitchMeta};
use crate::error::{ActionError, FetchError};
use crate::session::{SessionManager, SessionToken};
use crate::transport::{HttpReply, Transport};
use crate::ubus::{self, UbusCall, UBUS_PATH};

const APPLY_ROLLBACK_PATH: &str = "/cgi-bin/luci/admin/uci/apply_rollback";
const CONFIRM_PATH: &str = "/cgi-bin/luci/admin/uci/confirm";
const LUCI_PATH: &str = "/cgi-bin/luci/";

pub struct ActionRunner {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    host: String,
}

impl ActionRunner {
    pub fn new(host: &str, session: Arc<SessionManager>, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            session,
            host: host.to_string(),
        }
    }

    /// Flip a configured toggle on or off.
    pub async fn set_switch(&self, name: &str, on: bool) -> Result<(), ActionError> {
        let meta = entities::switch(name)
            .ok_or_else(|| ActionError::UnknownEntity(name.to_string()))?;
        let token = self.session.token().await?;
        let value = if on { meta.turn_on_value } else { meta.turn_off_value };

        self.uci_set(&token, meta, value).await?;
        if self.uci_has_changes(&token).await? {
            let rollback = self.apply_rollback(&token).await?;
            self.confirm(&token, &rollback).await?;
        }
        info!("switch {} on {} set to {}", meta.name, self.host, value);
        Ok(())
    }

    /// Run a one-shot button action.
    pub async fn press(&self, name: &str) -> Result<(), ActionError> {
        let meta = entities::button(name)
            .ok_or_else(|| ActionError::UnknownEntity(name.to_string()))?;
        let token = self.session.token().await?;
        match meta.action {
            ButtonAction::Reboot => {
                info!("rebooting {}", self.host);
                self.ubus_call(&token, "system", "reboot", json!({})).await?;
            }
            ButtonAction::ReconnectInterface(iface) => {
                info!("reconnecting interface {} on {}", iface, self.host);
                let object = format!("network.interface.{iface}");
                self.ubus_call(&token, &object, "down", json!({})).await?;
                self.ubus_call(&token, &object, "up", json!({})).await?;
            }
            ButtonAction::SubmitForm { path, fields } => {
                self.submit_form(&token, path, fields).await?;
            }
        }
        Ok(())
    }

    async fn uci_set(
        &self,
        token: &SessionToken,
        meta: &SwitchMeta,
        value: &str,
    ) -> Result<(), ActionError> {
        let mut values = Map::new();
        values.insert(meta.option.to_string(), Value::String(value.to_string()));
        let payload = self
            .ubus_call(
                token,
                "uci",
                "set",
                json!({"config": meta.config, "section": meta.section, "values": values}),
            )
            .await?;
        // ubus status 0 means the staging succeeded; the payload is empty.
        if payload.is_none() {
            warn!("uci set on {} returned a nonzero status", self.host);
            return Err(ActionError::Rejected);
        }
        Ok(())
    }

    async fn uci_has_changes(&self, token: &SessionToken) -> Result<bool, ActionError> {
        let payload = self.ubus_call(token, "uci", "changes", json!({})).await?;
        let pending = payload
            .as_ref()
            .and_then(|p| p.get("changes"))
            .map(|c| c != &json!({}))
            .unwrap_or(false);
        debug!("uci changes pending on {}: {}", self.host, pending);
        Ok(pending)
    }

    /// Staged changes are applied with a rollback window; the reply carries
    /// the token the confirm call needs to make them permanent.
    async fn apply_rollback(&self, token: &SessionToken) -> Result<String, ActionError> {
        let url = format!("{}{}", self.host, APPLY_ROLLBACK_PATH);
        let fields = [
            ("sid".to_string(), token.sysauth.clone()),
            ("token".to_string(), token.csrf.clone()),
        ];
        let reply = self
            .transport
            .post_form(&url, &form_headers(token), &fields)
            .await
            .map_err(FetchError::from)?;
        let raw = checked(&reply)?
            .json()
            .map_err(|e| FetchError::Unparseable(e.to_string()))?;
        raw.get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .ok_or(ActionError::Rejected)
    }

    async fn confirm(&self, token: &SessionToken, rollback: &str) -> Result<(), ActionError> {
        let url = format!("{}{}", self.host, CONFIRM_PATH);
        let fields = [("token".to_string(), rollback.to_string())];
        let reply = self
            .transport
            .post_form(&url, &form_headers(token), &fields)
            .await
            .map_err(FetchError::from)?;
        let reply = checked(&reply)?;
        if reply.body.trim() == "OK" {
            Ok(())
        } else {
            Err(ActionError::Rejected)
        }
    }

    async fn submit_form(
        &self,
        token: &SessionToken,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), ActionError> {
        let url = format!("{}{}{}", self.host, LUCI_PATH, path);
        let fields: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    v.replace("{{action_token}}", &token.csrf),
                )
            })
            .collect();
        info!("submitting form to {}", url);
        let reply = self
            .transport
            .post_form(&url, &form_headers(token), &fields)
            .await
            .map_err(FetchError::from)?;
        checked(&reply)?;
        Ok(())
    }

    /// One authenticated ubus call; `Ok(None)` means a nonzero ubus status.
    async fn ubus_call(
        &self,
        token: &SessionToken,
        object: &str,
        method: &str,
        args: Value,
    ) -> Result<Option<Value>, ActionError> {
        let url = format!("{}{}", self.host, UBUS_PATH);
        let call = UbusCall::new(1, &token.sysauth, object, method, args);
        let body = serde_json::to_value(&call)
            .map_err(|e| FetchError::Unparseable(e.to_string()))?;
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Cookie".to_string(), token.cookie()),
        ];
        let reply = self
            .transport
            .post_json(&url, &headers, body)
            .await
            .map_err(FetchError::from)?;
        let raw = checked(&reply)?
            .json()
            .map_err(|e| FetchError::Unparseable(e.to_string()))?;
        match ubus::result_parts(&raw) {
            Some((0, payload)) => Ok(Some(payload.cloned().unwrap_or_else(|| json!({})))),
            _ => Ok(None),
        }
    }
}

fn form_headers(token: &SessionToken) -> Vec<(String, String)> {
    vec![
        (
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        ),
        ("Cookie".to_string(), token.cookie()),
    ]
}

fn checked(reply: &HttpReply) -> Result<&HttpReply, FetchError> {
    if reply.status == 401 || reply.status == 403 {
        return Err(FetchError::Unauthorized);
    }
    if !reply.is_ok() {
        return Err(FetchError::UnexpectedStatus(reply.status));
    }
    Ok(reply)
}
