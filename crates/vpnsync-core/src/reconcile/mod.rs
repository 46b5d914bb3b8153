//! Core reconciliation engine
//!
//! The Reconciler executes exactly one reconciliation cycle:
//! - Resolving the configured DNS names via [`NameResolver`]
//! - Fetching the current network record via [`ControllerGateway`]
//! - Detecting divergence between desired and current endpoint addresses
//! - Committing a replacement record when (and only when) something changed
//!
//! ## Cycle flow
//!
//! ```text
//! ┌──────────────┐   resolve ×2    ┌──────────────┐
//! │ NameResolver │ ──────────────▶ │  Reconciler  │
//! └──────────────┘                 └──────────────┘
//!                                         │ connect / find / replace
//!                                         ▼
//!                                  ┌──────────────┐
//!                                  │  Controller  │
//!                                  │   Gateway    │
//!                                  └──────────────┘
//! ```
//!
//! Every remote failure is contained: it is logged, emitted as a
//! [`ReconcileEvent`], and folded into the returned [`CycleOutcome`]. The
//! reconciler never panics and never terminates the process; retrying is the
//! scheduler's job, one interval later.
//!
//! Change detection is a pure function of two [`EndpointPair`]s (see
//! [`plan_update`]), so it is testable without any network access.

use crate::config::SyncConfig;
use crate::error::Error;
use crate::traits::controller::{LOCAL_IP_FIELD, PEER_IP_FIELD};
use crate::traits::{ControllerGateway, NameResolver, NetworkConfig};
use serde_json::{Map, Value};
use std::net::Ipv4Addr;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the reconcile event channel; a cycle emits at most a handful
/// of events, so overflow only means a slow consumer
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The two tunnel endpoint addresses relevant to one direction at one
/// point in time
///
/// Two instances exist per cycle: the *desired* pair (from DNS) and the
/// *current* pair (from the controller). An absent field (resolution
/// failure, unmanaged endpoint, or a field missing from the controller
/// record) is a valid state distinct from "present but unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndpointPair {
    /// Local gateway address
    pub local: Option<Ipv4Addr>,
    /// Peer gateway address
    pub peer: Option<Ipv4Addr>,
}

impl EndpointPair {
    /// Extract the current endpoint pair from a controller record
    pub fn from_network(network: &NetworkConfig) -> Self {
        Self {
            local: network.ipv4_field(LOCAL_IP_FIELD),
            peer: network.ipv4_field(PEER_IP_FIELD),
        }
    }
}

/// One field-level endpoint change, with before/after values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChange {
    /// The controller field being rewritten
    pub field: &'static str,
    /// The controller's value before the change (absent if the field was
    /// missing)
    pub previous: Option<Ipv4Addr>,
    /// The resolved value being written
    pub new: Ipv4Addr,
}

/// The update decision for one cycle, derived from current vs. desired
///
/// A field changes only when the desired value is present AND differs from
/// the current value; an absent desired value never overwrites anything,
/// and a present-but-equal value never triggers a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatePlan {
    /// Pending change to the local endpoint field
    pub local: Option<FieldChange>,
    /// Pending change to the peer endpoint field
    pub peer: Option<FieldChange>,
}

impl UpdatePlan {
    /// Whether the local endpoint field would change
    pub fn change_local(&self) -> bool {
        self.local.is_some()
    }

    /// Whether the peer endpoint field would change
    pub fn change_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Whether the plan is a no-op
    pub fn is_noop(&self) -> bool {
        self.local.is_none() && self.peer.is_none()
    }

    /// The planned changes, local first
    pub fn changes(&self) -> Vec<FieldChange> {
        self.local.into_iter().chain(self.peer).collect()
    }

    /// Overwrite the changed fields in a replacement payload
    pub fn apply_to(&self, fields: &mut Map<String, Value>) {
        for change in self.changes() {
            fields.insert(
                change.field.to_string(),
                Value::String(change.new.to_string()),
            );
        }
    }
}

/// Compute the update decision for one cycle
///
/// Pure function of the current (controller) and desired (DNS) endpoint
/// pairs; no network access, independently testable.
pub fn plan_update(current: &EndpointPair, desired: &EndpointPair) -> UpdatePlan {
    UpdatePlan {
        local: plan_field(LOCAL_IP_FIELD, current.local, desired.local),
        peer: plan_field(PEER_IP_FIELD, current.peer, desired.peer),
    }
}

fn plan_field(
    field: &'static str,
    current: Option<Ipv4Addr>,
    desired: Option<Ipv4Addr>,
) -> Option<FieldChange> {
    let new = desired?;
    if current == Some(new) {
        return None;
    }
    Some(FieldChange {
        field,
        previous: current,
        new,
    })
}

/// The outcome of one reconciliation cycle
///
/// All three variants are non-fatal from the scheduler's perspective;
/// `Failed` carries the typed error for reporting only.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The replacement was committed; the listed fields changed
    Updated(Vec<FieldChange>),
    /// Desired and current agree; nothing was written
    NoChange,
    /// The cycle was cut short by a recoverable failure
    Failed(Error),
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A DNS lookup failed; the endpoint is treated as absent this cycle
    ResolutionFailed { hostname: String, error: String },

    /// The controller could not be reached or rejected the login
    ConnectFailed { error: String },

    /// The target network could not be retrieved (absent, or list failure)
    NetworkLookupFailed { network: String, error: String },

    /// Desired and current endpoint addresses agree
    NoChange { network: String },

    /// One endpoint field was committed with a new value
    EndpointUpdated {
        network: String,
        field: &'static str,
        previous: Option<Ipv4Addr>,
        new: Ipv4Addr,
    },

    /// The replacement was rejected or failed mid-write
    CommitFailed { network: String, error: String },
}

/// Core reconciler
///
/// Owns the collaborators for one managed network and executes one cycle at
/// a time. Holds no state across cycles beyond its immutable configuration:
/// the controller record is fetched fresh every cycle and discarded.
pub struct Reconciler {
    /// DNS resolver for the desired endpoint addresses
    resolver: Box<dyn NameResolver>,

    /// Gateway to the VPN controller
    gateway: Box<dyn ControllerGateway>,

    /// Name of the managed network
    network: String,

    /// DNS name of the local gateway (unmanaged when absent)
    local_dns: Option<String>,

    /// DNS name of the peer gateway (unmanaged when absent)
    peer_dns: Option<String>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `resolver`: name resolver implementation
    /// - `gateway`: controller gateway implementation
    /// - `config`: validated sync configuration
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events
    pub fn new(
        resolver: Box<dyn NameResolver>,
        gateway: Box<dyn ControllerGateway>,
        config: &SyncConfig,
    ) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let reconciler = Self {
            resolver,
            gateway,
            network: config.network.clone(),
            local_dns: config.local_dns.clone(),
            peer_dns: config.peer_dns.clone(),
            event_tx: tx,
        };

        (reconciler, rx)
    }

    /// Execute exactly one reconciliation cycle
    ///
    /// Resolve → connect → find → compare → (no-op | commit). Each failure
    /// along the way ends the cycle with `CycleOutcome::Failed` after being
    /// reported; none of them propagate.
    pub async fn run_cycle(&self) -> CycleOutcome {
        // The two resolutions are independent: failure of one must not
        // block or invalidate the other.
        let desired = EndpointPair {
            local: self.resolve_desired(self.local_dns.as_deref()).await,
            peer: self.resolve_desired(self.peer_dns.as_deref()).await,
        };
        debug!(
            local = ?desired.local,
            peer = ?desired.peer,
            "desired endpoint addresses from DNS"
        );

        let session = match self.gateway.connect().await {
            Ok(session) => session,
            Err(e) => {
                warn!("controller connection failed: {}", e);
                self.emit_event(ReconcileEvent::ConnectFailed {
                    error: e.to_string(),
                });
                return CycleOutcome::Failed(e);
            }
        };

        let network = match session.find_network(&self.network).await {
            Ok(network) => network,
            Err(e) => {
                warn!(network = %self.network, "network lookup failed: {}", e);
                self.emit_event(ReconcileEvent::NetworkLookupFailed {
                    network: self.network.clone(),
                    error: e.to_string(),
                });
                return CycleOutcome::Failed(e);
            }
        };

        let current = EndpointPair::from_network(&network);
        let plan = plan_update(&current, &desired);

        if plan.is_noop() {
            info!(network = %self.network, "no changes");
            self.emit_event(ReconcileEvent::NoChange {
                network: self.network.clone(),
            });
            return CycleOutcome::NoChange;
        }

        let mut payload = network.fields.clone();
        plan.apply_to(&mut payload);

        match session.replace_network(&network.id, &payload).await {
            Ok(()) => {
                let changes = plan.changes();
                for change in &changes {
                    info!(
                        network = %self.network,
                        field = change.field,
                        "{} => {}",
                        change
                            .previous
                            .map(|ip| ip.to_string())
                            .unwrap_or_else(|| "unset".to_string()),
                        change.new,
                    );
                    self.emit_event(ReconcileEvent::EndpointUpdated {
                        network: self.network.clone(),
                        field: change.field,
                        previous: change.previous,
                        new: change.new,
                    });
                }
                CycleOutcome::Updated(changes)
            }
            Err(e) => {
                // Controller state is unknown here; assume unchanged and let
                // the next cycle re-evaluate from a fresh comparison.
                warn!(network = %self.network, "commit failed: {}", e);
                self.emit_event(ReconcileEvent::CommitFailed {
                    network: self.network.clone(),
                    error: e.to_string(),
                });
                CycleOutcome::Failed(e)
            }
        }
    }

    /// Resolve one endpoint's desired address
    ///
    /// An unconfigured or empty DNS name means the endpoint is simply not
    /// managed: no lookup is attempted. A failed lookup is reported and
    /// degrades to absent.
    async fn resolve_desired(&self, hostname: Option<&str>) -> Option<Ipv4Addr> {
        let hostname = hostname?;
        if hostname.is_empty() {
            return None;
        }

        debug!(hostname, "resolving endpoint DNS name");
        match self.resolver.resolve_v4(hostname).await {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!(hostname, "DNS A record could not be retrieved: {}", e);
                self.emit_event(ReconcileEvent::ResolutionFailed {
                    hostname: hostname.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        // A full channel means the consumer is slower than the poll
        // interval; drop rather than block the cycle.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping reconcile event");
        }
    }
}
