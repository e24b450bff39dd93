//! The dispatcher (§4.8 component 8): the single entry point for every
//! frame the link hands to the data plane. Parses the Ethernet header and
//! switches on ethertype; everything else is delegated.

use std::time::Instant;

use tracing::trace;

use crate::state::{Outcome, RouterState};
use crate::wire::ethernet::{EthernetHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4};

pub fn dispatch(state: &RouterState, in_iface: &str, frame: &[u8], now: Instant) -> Outcome {
    state.counters.inc_frames_in();

    let eth = match EthernetHeader::parse(frame) {
        Ok(eth) => eth,
        Err(err) => {
            state.counters.inc_frames_dropped_malformed();
            trace!(iface = in_iface, ?err, "dropping short ethernet frame");
            return Outcome::drop();
        }
    };

    if eth.dst.is_multicast() {
        trace!(iface = in_iface, dst = %eth.dst, "dropping multicast-addressed frame, unsupported");
        return Outcome::drop();
    }

    if !eth.dst.is_broadcast() && state.interfaces.by_mac(eth.dst).is_none() {
        trace!(iface = in_iface, dst = %eth.dst, "dropping frame not addressed to this router");
        return Outcome::drop();
    }

    match eth.ethertype {
        ETHERTYPE_ARP => crate::arp_handler::handle(state, in_iface, eth.payload, now),
        ETHERTYPE_IPV4 => crate::forwarding::handle_ipv4(state, in_iface, frame, now),
        other => {
            trace!(ethertype = other, "dropping frame with unhandled ethertype");
            Outcome::drop()
        }
    }
}
