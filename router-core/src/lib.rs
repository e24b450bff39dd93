//! Data-plane core of a software IPv4 router: wire codec, interface and
//! routing tables, ARP cache with pending-request/retry state machine,
//! forwarding engine, and ICMP responder.
//!
//! This crate never touches a socket. Every operation either returns a
//! [`Transmit`] for the caller to put on the wire, or nothing (the frame
//! was silently dropped). The ARP timer thread and the concrete link
//! adapter live in the `router` binary crate.

pub mod arp_cache;
pub mod arp_handler;
pub mod counters;
pub mod dispatcher;
pub mod error;
pub mod forwarding;
pub mod icmp_responder;
pub mod iface;
pub mod route;
pub mod state;
pub mod wire;

pub use arp_cache::ArpCache;
pub use counters::Counters;
pub use error::{ConfigError, WireError};
pub use iface::{Interface, InterfaceTable};
pub use route::{Route, RoutingTable};
pub use state::{Outcome, RouterState, Transmit};
