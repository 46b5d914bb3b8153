//! Configuration types for the endpoint sync system
//!
//! The configuration is assembled once at startup (by the daemon, from
//! environment variables) and passed explicitly into the scheduler and the
//! reconciler. It is never mutated after validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Controller connection settings
    pub controller: ControllerConfig,

    /// Name of the VPN network to keep updated (exact, case-sensitive match)
    pub network: String,

    /// DNS name for the local gateway endpoint (unmanaged when absent)
    #[serde(default)]
    pub local_dns: Option<String>,

    /// DNS name for the peer gateway endpoint (unmanaged when absent)
    #[serde(default)]
    pub peer_dns: Option<String>,

    /// Seconds between the end of one cycle and the start of the next
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run exactly one cycle and exit
    #[serde(default)]
    pub run_once: bool,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.controller.validate()?;

        if self.network.is_empty() {
            return Err(crate::Error::config("Network name cannot be empty"));
        }

        if self.interval_secs == 0 {
            return Err(crate::Error::config("Interval must be at least 1 second"));
        }

        let has_local = self.local_dns.as_deref().is_some_and(|d| !d.is_empty());
        let has_peer = self.peer_dns.as_deref().is_some_and(|d| !d.is_empty());
        if !has_local && !has_peer {
            return Err(crate::Error::config(
                "At least one of local and peer DNS names must be set",
            ));
        }

        Ok(())
    }

    /// The poll interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Controller connection configuration
///
/// The `Debug` implementation intentionally does not expose the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Controller port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Controller username
    #[serde(default = "default_username")]
    pub username: String,

    /// Controller password
    pub password: String,

    /// Site identifier on the controller
    #[serde(default = "default_site")]
    pub site: String,

    /// Verify the controller's TLS certificate (controllers commonly ship
    /// self-signed certificates, so this defaults to off)
    #[serde(default)]
    pub verify_tls: bool,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("site", &self.site)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl ControllerConfig {
    /// Validate the controller configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("Controller host cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::config("Controller port cannot be zero"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("Controller password is required"));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "unifi".to_string()
}

fn default_port() -> u16 {
    8443
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_site() -> String {
    "default".to_string()
}

fn default_interval_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SyncConfig {
        SyncConfig {
            controller: ControllerConfig {
                host: default_host(),
                port: default_port(),
                username: default_username(),
                password: "secret".to_string(),
                site: default_site(),
                verify_tls: false,
            },
            network: "site-to-site".to_string(),
            local_dns: Some("gw.example.com".to_string()),
            peer_dns: None,
            interval_secs: 60,
            run_once: false,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn missing_password_rejected() {
        let mut config = base_config();
        config.controller.password.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_network_rejected() {
        let mut config = base_config();
        config.network.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut config = base_config();
        config.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn no_dns_names_rejected() {
        let mut config = base_config();
        config.local_dns = None;
        config.peer_dns = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn interval_is_whole_seconds() {
        let config = base_config();
        assert_eq!(config.interval(), Duration::from_secs(60));
    }

    #[test]
    fn debug_redacts_password() {
        let config = base_config();
        let rendered = format!("{:?}", config.controller);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<REDACTED>"));
    }
}
