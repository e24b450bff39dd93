//! `RouterState`: the one shared instance a router process owns, plus the
//! `Transmit`/`Outcome` values every core operation funnels its output
//! through.

use std::time::Instant;

use crate::arp_cache::ArpCache;
use crate::counters::Counters;
use crate::iface::InterfaceTable;
use crate::route::RoutingTable;

/// A frame the caller must put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    pub iface: String,
    pub bytes: Vec<u8>,
}

/// The result of handling one frame, or one timer tick: zero or more
/// frames to transmit. Never a `Result` — every core operation either
/// produces transmits or silently drops, per the error-handling design.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub transmits: Vec<Transmit>,
}

impl Outcome {
    pub fn drop() -> Self {
        Self::default()
    }

    pub fn single(transmit: Transmit) -> Self {
        Self {
            transmits: vec![transmit],
        }
    }

    pub fn push(&mut self, transmit: Transmit) {
        self.transmits.push(transmit);
    }

    pub fn merge(mut self, other: Outcome) -> Self {
        self.transmits.extend(other.transmits);
        self
    }
}

/// Everything the data plane needs. `interfaces` and `routing_table` are
/// immutable after construction; `cache` and `counters` are the only
/// shared-mutable state, and both are internally synchronized.
pub struct RouterState {
    pub interfaces: InterfaceTable,
    pub routing_table: RoutingTable,
    pub cache: ArpCache,
    pub counters: Counters,
}

impl RouterState {
    pub fn new(interfaces: InterfaceTable, routing_table: RoutingTable) -> Self {
        Self {
            interfaces,
            routing_table,
            cache: ArpCache::new(),
            counters: Counters::new(),
        }
    }

    /// Entry point for every received frame (§4.8 dispatcher).
    pub fn on_frame(&self, in_iface: &str, bytes: &[u8], now: Instant) -> Outcome {
        crate::dispatcher::dispatch(self, in_iface, bytes, now)
    }

    /// Entry point for the timer thread's once-a-second tick (§4.5).
    pub fn on_tick(&self, now: Instant) -> Outcome {
        crate::arp_handler::run_sweep(self, now)
    }
}
