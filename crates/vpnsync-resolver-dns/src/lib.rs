// # DNS Name Resolver
//
// This crate provides the hickory-resolver backed NameResolver
// implementation for the endpoint sync system.
//
// ## Behavior
//
// - Resolves A records only; the first answer wins (deterministic
//   single-answer policy)
// - Every lookup failure (NXDOMAIN, timeout, transport error, an answer
//   with zero A records) surfaces as a recoverable `Error::Resolution`;
//   nothing here can take down a cycle, let alone the process
// - Uses the system resolv.conf by default; an explicit upstream
//   configuration can be supplied for deployments without one

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::net::Ipv4Addr;
use tracing::debug;
use vpnsync_core::{Error, NameResolver, Result};

/// hickory-resolver backed name resolver
pub struct DnsNameResolver {
    resolver: TokioAsyncResolver,
}

impl DnsNameResolver {
    /// Create a resolver from the system resolv.conf
    ///
    /// # Returns
    ///
    /// - `Ok(DnsNameResolver)`: the system configuration was readable
    /// - `Err(Error::Config)`: no usable system configuration
    pub fn from_system_conf() -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| Error::config(format!("failed to load system resolv.conf: {}", e)))?;
        Ok(Self { resolver })
    }

    /// Create a resolver with an explicit upstream configuration
    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl NameResolver for DnsNameResolver {
    async fn resolve_v4(&self, hostname: &str) -> Result<Ipv4Addr> {
        let lookup = self
            .resolver
            .ipv4_lookup(hostname)
            .await
            .map_err(|e| Error::resolution(format!("A record lookup for {}: {}", hostname, e)))?;

        let ip = lookup
            .iter()
            .next()
            .map(|a| a.0)
            .ok_or_else(|| Error::resolution(format!("no A records for {}", hostname)))?;

        debug!(hostname, %ip, "resolved A record");
        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn construction_with_explicit_config() {
        // Default upstream config; no queries are issued here.
        let _resolver =
            DnsNameResolver::with_config(ResolverConfig::default(), ResolverOpts::default());
    }
}
