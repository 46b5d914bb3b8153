// # Controller Gateway Trait
//
// Defines the interface for the VPN controller holding the authoritative
// network configuration records.
//
// ## Implementations
//
// - UniFi classic REST API: `vpnsync-controller-unifi` crate
//
// ## Session model
//
// The gateway authenticates once per cycle and hands back a session; the
// reconciler performs its lookups and the optional replace through that
// session and drops it at the end of the cycle. Nothing is cached across
// cycles.
//
// ## Failure semantics
//
// Each operation is independently fallible. A failed `connect` means no
// network can be reached this cycle; a failed `find_network` aborts the
// cycle for that network only; a failed `replace_network` leaves the
// controller state unknown (assumed unchanged) for the next cycle to
// re-evaluate. None of these terminate the process.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::net::Ipv4Addr;

/// Controller field holding the local tunnel endpoint address
pub const LOCAL_IP_FIELD: &str = "ipsec_local_ip";

/// Controller field holding the peer tunnel endpoint address
pub const PEER_IP_FIELD: &str = "ipsec_peer_ip";

/// Controller field holding the record identifier
pub const ID_FIELD: &str = "_id";

/// Controller field holding the network name
pub const NAME_FIELD: &str = "name";

/// One network configuration record as held by the controller
///
/// The record is fetched fresh each cycle, mutated locally to build the
/// replacement payload, and discarded afterwards. `fields` carries the full
/// record *minus* its identifier, so unknown controller fields round-trip
/// through a replace unchanged and the identifier can never re-enter the
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Opaque controller-side identifier (never part of a replace payload)
    pub id: String,

    /// Network name (the lookup key)
    pub name: String,

    /// All remaining record fields, verbatim
    pub fields: Map<String, Value>,
}

impl NetworkConfig {
    /// Build a `NetworkConfig` from a raw controller record
    ///
    /// Removes the identifier from the field map and extracts the name.
    ///
    /// # Returns
    ///
    /// - `Ok(NetworkConfig)`: the parsed record
    /// - `Err(Error)`: the record has no identifier or no name
    pub fn from_record(mut record: Map<String, Value>) -> Result<Self, crate::Error> {
        let id = match record.remove(ID_FIELD) {
            Some(Value::String(id)) => id,
            _ => {
                return Err(crate::Error::connectivity(
                    "network record has no identifier",
                ));
            }
        };

        let name = match record.get(NAME_FIELD).and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => return Err(crate::Error::connectivity("network record has no name")),
        };

        Ok(Self {
            id,
            name,
            fields: record,
        })
    }

    /// Read an IPv4 address field from the record
    ///
    /// Returns `None` when the field is missing or does not parse as an
    /// IPv4 address; both are the "absent" state as far as change
    /// detection is concerned.
    pub fn ipv4_field(&self, field: &str) -> Option<Ipv4Addr> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

/// Trait for controller gateway implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait ControllerGateway: Send + Sync {
    /// Establish an authenticated session with the controller
    ///
    /// # Returns
    ///
    /// - `Ok(session)`: login accepted
    /// - `Err(Error::Connectivity)`: controller unreachable or login rejected
    async fn connect(&self) -> Result<Box<dyn ControllerSession>, crate::Error>;
}

/// An authenticated controller session, valid for one reconciliation cycle
#[async_trait]
pub trait ControllerSession: Send + Sync {
    /// Find a network configuration by exact, case-sensitive name
    ///
    /// The controller API offers no indexed lookup, so implementations list
    /// every network configuration and scan for the name; the last match in
    /// iteration order wins when duplicates exist.
    ///
    /// # Returns
    ///
    /// - `Ok(NetworkConfig)`: the matching record
    /// - `Err(Error::NotFound)`: no record carries that name
    /// - `Err(Error)`: the list could not be retrieved
    async fn find_network(&self, name: &str) -> Result<NetworkConfig, crate::Error>;

    /// Replace a network configuration record
    ///
    /// `fields` is the full record to store, without the identifier; the
    /// identifier only addresses the target.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the controller accepted the replacement
    /// - `Err(Error::Commit)`: rejected or transport error mid-write
    async fn replace_network(
        &self,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), crate::Error>;
}
