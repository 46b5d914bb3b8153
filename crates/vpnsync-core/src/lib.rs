// # vpnsync-core
//
// Core library for DNS-driven VPN endpoint synchronization.
//
// ## Architecture Overview
//
// This library provides the core of the reconciliation loop that keeps a
// VPN gateway's configured tunnel endpoint addresses in step with the
// addresses currently published in DNS:
//
// - **NameResolver**: trait for resolving a DNS name to an IPv4 address
// - **ControllerGateway / ControllerSession**: traits for the network
//   controller holding the authoritative configuration record
// - **Reconciler**: one resolve → fetch → compare → commit cycle, with
//   per-step error containment
// - **Scheduler**: fixed-interval (or run-once) driver around the
//   reconciler, strictly sequential
//
// ## Design Principles
//
// 1. **Separation of Concerns**: the core never performs network I/O
//    itself; collaborators enter through trait objects
// 2. **Typed failures**: every remote operation's failure mode is visible
//    in its signature, and all of them are recoverable at the cycle level
// 3. **Stateless cycles**: the controller record is fetched fresh each
//    cycle and discarded; the fixed schedule is the only retry mechanism
// 4. **Pure change detection**: the update decision is a pure function of
//    two endpoint pairs, testable without any network

pub mod config;
pub mod error;
pub mod reconcile;
pub mod scheduler;
pub mod traits;

// Re-export core types for convenience
pub use config::{ControllerConfig, SyncConfig};
pub use error::{Error, Result};
pub use reconcile::{CycleOutcome, EndpointPair, ReconcileEvent, Reconciler, UpdatePlan};
pub use scheduler::Scheduler;
pub use traits::{ControllerGateway, ControllerSession, NameResolver, NetworkConfig};
