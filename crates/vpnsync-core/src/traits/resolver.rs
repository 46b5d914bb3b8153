// # Name Resolver Trait
//
// Defines the interface for resolving a DNS name to an IPv4 address.
//
// ## Implementations
//
// - hickory-resolver based: `vpnsync-resolver-dns` crate
//
// ## Contract
//
// A lookup failure of any kind (NXDOMAIN, timeout, transport error, an
// answer with zero A records) is a recoverable `Error::Resolution`. The
// reconciler turns it into an absent desired address for that endpoint;
// implementations must never panic or abort for these conditions.
//
// Multi-answer records are not disambiguated: the first resolved address
// wins, deterministically.

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for name resolver implementations
///
/// Implementations must be thread-safe and usable across async tasks.
/// The decision to skip a lookup entirely (no DNS name configured for an
/// endpoint) belongs to the reconciler, so this trait only ever sees
/// non-empty host names.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve a host name to its first IPv4 address
    ///
    /// # Parameters
    ///
    /// - `hostname`: the DNS name to look up (non-empty)
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: the first A record in the answer
    /// - `Err(Error::Resolution)`: the lookup failed or returned no A records
    async fn resolve_v4(&self, hostname: &str) -> Result<Ipv4Addr, crate::Error>;
}
