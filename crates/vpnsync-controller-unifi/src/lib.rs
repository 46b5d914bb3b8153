// # UniFi Controller Gateway
//
// This crate implements the ControllerGateway against the classic UniFi
// controller REST API.
//
// ## API Reference
//
// - Login:  POST `/api/login` with JSON `{username, password}`; the
//   controller answers with a session cookie
// - List:   GET `/api/s/:site/rest/networkconf`
// - Update: PUT `/api/s/:site/rest/networkconf/:id`
//
// Every response carries the envelope `{"meta": {"rc": ...}, "data": [...]}`;
// `rc != "ok"` is an API-level failure even under HTTP 200.
//
// ## Session model
//
// `connect()` builds a fresh cookie-jar client and logs in; the returned
// session is used for one reconciliation cycle and dropped. Nothing is
// cached across cycles.
//
// ## TLS
//
// Controllers commonly ship self-signed certificates. Certificate
// verification is therefore governed by the `verify_tls` setting and is off
// by default.
//
// ## Security
//
// The password never appears in logs; the Debug implementation redacts it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;
use vpnsync_core::traits::{ControllerGateway, ControllerSession, NetworkConfig};
use vpnsync_core::{ControllerConfig, Error, Result};

/// Default HTTP timeout for controller requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway to one UniFi controller
pub struct UnifiGateway {
    /// Base URL, e.g. `https://unifi:8443`
    base_url: String,

    /// Login username
    username: String,

    /// Login password
    /// Never log this value
    password: String,

    /// Site identifier on the controller
    site: String,

    /// Verify the controller's TLS certificate
    verify_tls: bool,
}

impl std::fmt::Debug for UnifiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiGateway")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("site", &self.site)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl UnifiGateway {
    /// Create a new gateway
    pub fn new(
        host: impl AsRef<str>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        site: impl Into<String>,
        verify_tls: bool,
    ) -> Self {
        Self {
            base_url: format!("https://{}:{}", host.as_ref(), port),
            username: username.into(),
            password: password.into(),
            site: site.into(),
            verify_tls,
        }
    }

    /// Create a gateway from a controller configuration
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(
            &config.host,
            config.port,
            config.username.clone(),
            config.password.clone(),
            config.site.clone(),
            config.verify_tls,
        )
    }

    /// Build the per-session HTTP client
    ///
    /// Each session gets its own cookie jar so one cycle's login can never
    /// leak into the next.
    fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(!self.verify_tls)
            .build()
            .map_err(|e| Error::connectivity(format!("failed to build HTTP client: {}", e)))
    }
}

#[async_trait]
impl ControllerGateway for UnifiGateway {
    async fn connect(&self) -> Result<Box<dyn ControllerSession>> {
        let client = self.build_client()?;
        let url = format!("{}/api/login", self.base_url);

        debug!(url = %url, username = %self.username, "logging in to controller");

        let response = client
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| {
                Error::connectivity(format!("no controller found at {}: {}", self.base_url, e))
            })?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(Error::connectivity("login to the controller failed"));
        }
        if !status.is_success() {
            return Err(Error::connectivity(format!(
                "controller login returned {}",
                status
            )));
        }

        let envelope: UnifiEnvelope = response
            .json()
            .await
            .map_err(|e| Error::connectivity(format!("invalid login response: {}", e)))?;
        envelope.meta.check().map_err(Error::connectivity)?;

        Ok(Box::new(UnifiSession {
            client,
            base_url: self.base_url.clone(),
            site: self.site.clone(),
        }))
    }
}

/// One logged-in controller session (cookie jar lives in the client)
pub struct UnifiSession {
    client: reqwest::Client,
    base_url: String,
    site: String,
}

#[async_trait]
impl ControllerSession for UnifiSession {
    async fn find_network(&self, name: &str) -> Result<NetworkConfig> {
        let url = format!("{}/api/s/{}/rest/networkconf", self.base_url, self.site);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::connectivity(format!("network list request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::connectivity(format!(
                "network list returned {}",
                status
            )));
        }

        let envelope: UnifiEnvelope = response
            .json()
            .await
            .map_err(|e| Error::connectivity(format!("invalid network list response: {}", e)))?;
        envelope.meta.check().map_err(Error::connectivity)?;

        debug!(count = envelope.data.len(), "retrieved network configurations");

        // The API has no indexed lookup; scan the full list.
        let record = select_network(envelope.data, name).ok_or_else(|| Error::not_found(name))?;
        NetworkConfig::from_record(record)
    }

    async fn replace_network(&self, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let url = format!(
            "{}/api/s/{}/rest/networkconf/{}",
            self.base_url, self.site, id
        );

        let response = self
            .client
            .put(&url)
            .json(fields)
            .send()
            .await
            .map_err(|e| Error::commit(format!("network update request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::commit(format!("network update returned {}", status)));
        }

        let envelope: UnifiEnvelope = response
            .json()
            .await
            .map_err(|e| Error::commit(format!("invalid network update response: {}", e)))?;
        envelope.meta.check().map_err(Error::commit)?;

        Ok(())
    }
}

/// Select the record whose name matches exactly; the last match in
/// iteration order wins when duplicates exist
fn select_network(data: Vec<Map<String, Value>>, name: &str) -> Option<Map<String, Value>> {
    let mut found = None;
    for record in data {
        if record.get("name").and_then(Value::as_str) == Some(name) {
            found = Some(record);
        }
    }
    found
}

/// Standard UniFi response envelope
#[derive(Debug, Deserialize)]
struct UnifiEnvelope {
    meta: UnifiMeta,
    #[serde(default)]
    data: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct UnifiMeta {
    rc: String,
    #[serde(default)]
    msg: Option<String>,
}

impl UnifiMeta {
    /// Map `rc != "ok"` to an error message
    fn check(&self) -> std::result::Result<(), String> {
        if self.rc == "ok" {
            return Ok(());
        }
        match &self.msg {
            Some(msg) => Err(format!("controller API error: {} ({})", self.rc, msg)),
            None => Err(format!("controller API error: {}", self.rc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, name: &str) -> Map<String, Value> {
        match json!({ "_id": id, "name": name }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn select_network_matches_exact_name() {
        let data = vec![record("1", "corporate"), record("2", "site-to-site")];
        let found = select_network(data, "site-to-site").unwrap();
        assert_eq!(found["_id"], "2");
    }

    #[test]
    fn select_network_is_case_sensitive() {
        let data = vec![record("1", "Site-To-Site")];
        assert!(select_network(data, "site-to-site").is_none());
    }

    #[test]
    fn select_network_last_duplicate_wins() {
        let data = vec![
            record("1", "site-to-site"),
            record("2", "other"),
            record("3", "site-to-site"),
        ];
        let found = select_network(data, "site-to-site").unwrap();
        assert_eq!(found["_id"], "3");
    }

    #[test]
    fn envelope_parses_and_checks_rc() {
        let envelope: UnifiEnvelope = serde_json::from_value(json!({
            "meta": { "rc": "ok" },
            "data": [{ "_id": "1", "name": "site-to-site" }],
        }))
        .unwrap();
        assert!(envelope.meta.check().is_ok());
        assert_eq!(envelope.data.len(), 1);

        let envelope: UnifiEnvelope = serde_json::from_value(json!({
            "meta": { "rc": "error", "msg": "api.err.LoginRequired" },
        }))
        .unwrap();
        let err = envelope.meta.check().unwrap_err();
        assert!(err.contains("api.err.LoginRequired"));
    }

    #[test]
    fn gateway_base_url_and_redacted_debug() {
        let gateway = UnifiGateway::new("unifi", 8443, "admin", "hunter2", "default", false);
        assert_eq!(gateway.base_url, "https://unifi:8443");

        let rendered = format!("{:?}", gateway);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<REDACTED>"));
    }

    #[test]
    fn from_config_carries_all_fields() {
        let config = ControllerConfig {
            host: "ctrl.example.com".to_string(),
            port: 443,
            username: "svc".to_string(),
            password: "pw".to_string(),
            site: "branch".to_string(),
            verify_tls: true,
        };
        let gateway = UnifiGateway::from_config(&config);
        assert_eq!(gateway.base_url, "https://ctrl.example.com:443");
        assert_eq!(gateway.site, "branch");
        assert!(gateway.verify_tls);
    }
}
