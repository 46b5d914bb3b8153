//! Test doubles and common utilities for reconciliation contract tests
//!
//! The mocks count calls and capture payloads so tests can assert what the
//! core actually sent, without any network access. They are `Clone` with
//! shared interior state, so a test can keep a handle after the reconciler
//! takes ownership of its copy.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vpnsync_core::error::Result;
use vpnsync_core::traits::controller::ID_FIELD;
use vpnsync_core::traits::{ControllerGateway, ControllerSession, NameResolver, NetworkConfig};
use vpnsync_core::{ControllerConfig, Error, SyncConfig};

/// A scripted name resolver
#[derive(Clone, Default)]
pub struct MockResolver {
    answers: Arc<Mutex<HashMap<String, Ipv4Addr>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful answer for a hostname
    pub fn set_answer(&self, hostname: &str, ip: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(hostname.to_string(), ip.parse().unwrap());
    }

    /// Script a lookup failure for a hostname
    pub fn set_failing(&self, hostname: &str) {
        self.failing.lock().unwrap().insert(hostname.to_string());
    }

    /// Number of times resolve_v4() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NameResolver for MockResolver {
    async fn resolve_v4(&self, hostname: &str) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(hostname) {
            return Err(Error::resolution(format!("lookup failed for {hostname}")));
        }

        self.answers
            .lock()
            .unwrap()
            .get(hostname)
            .copied()
            .ok_or_else(|| Error::resolution(format!("no A records for {hostname}")))
    }
}

/// A mock controller that serves one stored record and applies replacements
/// to it, so consecutive cycles see the committed state
#[derive(Clone, Default)]
pub struct MockGateway {
    record: Arc<Mutex<Option<Map<String, Value>>>>,
    fail_connect: Arc<AtomicBool>,
    fail_replace: Arc<AtomicBool>,
    connect_calls: Arc<AtomicUsize>,
    find_calls: Arc<AtomicUsize>,
    replace_calls: Arc<AtomicUsize>,
    replaced: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway serving the given raw record (including its `_id`)
    pub fn with_record(record: Map<String, Value>) -> Self {
        let gateway = Self::default();
        *gateway.record.lock().unwrap() = Some(record);
        gateway
    }

    /// Make connect() fail with a connectivity error
    pub fn fail_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    /// Make replace_network() fail with a commit error
    pub fn fail_replace(&self) {
        self.fail_replace.store(true, Ordering::SeqCst);
    }

    pub fn connect_call_count(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn find_call_count(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn replace_call_count(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// The (id, payload) pairs passed to replace_network(), in order
    pub fn replaced_payloads(&self) -> Vec<(String, Map<String, Value>)> {
        self.replaced.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControllerGateway for MockGateway {
    async fn connect(&self) -> Result<Box<dyn ControllerSession>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::connectivity("no controller found"));
        }

        Ok(Box::new(MockSession {
            gateway: self.clone(),
        }))
    }
}

struct MockSession {
    gateway: MockGateway,
}

#[async_trait]
impl ControllerSession for MockSession {
    async fn find_network(&self, name: &str) -> Result<NetworkConfig> {
        self.gateway.find_calls.fetch_add(1, Ordering::SeqCst);

        let record = self.gateway.record.lock().unwrap().clone();
        match record {
            Some(record) if record.get("name").and_then(Value::as_str) == Some(name) => {
                NetworkConfig::from_record(record)
            }
            _ => Err(Error::not_found(name)),
        }
    }

    async fn replace_network(&self, id: &str, fields: &Map<String, Value>) -> Result<()> {
        self.gateway.replace_calls.fetch_add(1, Ordering::SeqCst);

        if self.gateway.fail_replace.load(Ordering::SeqCst) {
            return Err(Error::commit("error burning update to network"));
        }

        self.gateway
            .replaced
            .lock()
            .unwrap()
            .push((id.to_string(), fields.clone()));

        // Mirror the controller: the stored record becomes the payload,
        // keyed by the same identifier.
        let mut stored = fields.clone();
        stored.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        *self.gateway.record.lock().unwrap() = Some(stored);

        Ok(())
    }
}

/// Build a raw controller record for one VPN network
pub fn vpn_record(id: &str, name: &str, local: Option<&str>, peer: Option<&str>) -> Map<String, Value> {
    let mut record = match json!({
        "_id": id,
        "name": name,
        "purpose": "site-vpn",
        "vpn_type": "ipsec-vpn",
        "enabled": true,
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    if let Some(local) = local {
        record.insert("ipsec_local_ip".to_string(), json!(local));
    }
    if let Some(peer) = peer {
        record.insert("ipsec_peer_ip".to_string(), json!(peer));
    }
    record
}

/// Helper to create a minimal SyncConfig for testing
pub fn test_config(
    network: &str,
    local_dns: Option<&str>,
    peer_dns: Option<&str>,
) -> SyncConfig {
    SyncConfig {
        controller: ControllerConfig {
            host: "unifi".to_string(),
            port: 8443,
            username: "admin".to_string(),
            password: "test-password".to_string(),
            site: "default".to_string(),
            verify_tls: false,
        },
        network: network.to_string(),
        local_dns: local_dns.map(str::to_string),
        peer_dns: peer_dns.map(str::to_string),
        interval_secs: 300,
        run_once: false,
    }
}
