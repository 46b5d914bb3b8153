//! Core traits for the endpoint sync system
//!
//! This module defines the abstract interfaces the reconciler depends on.
//!
//! - [`NameResolver`]: resolve a DNS name to an IPv4 address
//! - [`ControllerGateway`] / [`ControllerSession`]: talk to the VPN controller

pub mod controller;
pub mod resolver;

pub use controller::{ControllerGateway, ControllerSession, NetworkConfig};
pub use resolver::NameResolver;
