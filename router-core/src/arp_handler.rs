//! ARP ingress (§4.9) and the ARP timer's once-a-second sweep (§4.5).
//!
//! Everything here either answers an ARP request, drains a `PendingRequest`
//! after a reply, or turns a [`SweepAction`](crate::arp_cache::SweepAction)
//! into frames to send. None of it touches the link directly.

use std::net::Ipv4Addr;
use std::time::Instant;

use tracing::{debug, trace};

use crate::arp_cache::{PendingPacket, SweepAction};
use crate::iface::Interface;
use crate::state::{Outcome, RouterState, Transmit};
use crate::wire::arp::{ArpPacket, ARP_OP_REPLY, ARP_OP_REQUEST};
use crate::wire::ethernet::{EthernetHeader, ETHERTYPE_ARP};
use crate::wire::MacAddr;

/// Builds a broadcast ARP request frame: dst = broadcast, sender = `from`,
/// target MAC unknown, target IP = `target_ip` (§4.8).
pub(crate) fn build_arp_probe(from: &Interface, target_ip: Ipv4Addr) -> Vec<u8> {
    let arp = ArpPacket::build(
        ARP_OP_REQUEST,
        from.mac,
        from.ip,
        MacAddr::ZERO,
        target_ip,
    );
    EthernetHeader::build(from.mac, MacAddr::BROADCAST, ETHERTYPE_ARP, &arp)
}

/// Handles an ARP payload (Ethernet header already stripped) received on
/// `in_iface`.
pub fn handle(state: &RouterState, in_iface: &str, arp_payload: &[u8], now: Instant) -> Outcome {
    let pkt = match ArpPacket::parse(arp_payload) {
        Ok(pkt) => pkt,
        Err(err) => {
            state.counters.inc_frames_dropped_malformed();
            trace!(iface = in_iface, ?err, "dropping malformed arp packet");
            return Outcome::drop();
        }
    };

    match pkt.operation {
        ARP_OP_REQUEST => handle_request(state, in_iface, &pkt),
        ARP_OP_REPLY => handle_reply(state, &pkt, now),
        other => {
            trace!(operation = other, "dropping arp packet with unknown opcode");
            Outcome::drop()
        }
    }
}

fn handle_request(state: &RouterState, in_iface: &str, pkt: &ArpPacket) -> Outcome {
    let Some(local) = state.interfaces.by_ip(pkt.target_ip) else {
        trace!(target = %pkt.target_ip, "arp request not for a local address, dropping");
        return Outcome::drop();
    };

    let reply_arp = pkt.build_reply(local.mac, local.ip);
    let frame = EthernetHeader::build(local.mac, pkt.sender_mac, ETHERTYPE_ARP, &reply_arp);
    state.counters.inc_arp_replies_sent();
    debug!(iface = in_iface, requester = %pkt.sender_ip, "answering arp request");
    Outcome::single(Transmit {
        iface: in_iface.to_string(),
        bytes: frame,
    })
}

fn handle_reply(state: &RouterState, pkt: &ArpPacket, now: Instant) -> Outcome {
    state.counters.inc_arp_resolutions();
    let Some(pending) = state.cache.insert(pkt.sender_ip, pkt.sender_mac, now) else {
        trace!(ip = %pkt.sender_ip, "arp reply resolved with no pending request");
        return Outcome::drop();
    };

    debug!(
        ip = %pkt.sender_ip,
        mac = %pkt.sender_mac,
        queued = pending.packets.len(),
        "arp reply drains pending queue"
    );

    let mut outcome = Outcome::drop();
    for packet in pending.packets {
        outcome.push(rewrite_and_frame(state, packet, pkt.sender_mac));
    }
    outcome
}

fn rewrite_and_frame(state: &RouterState, mut packet: PendingPacket, next_hop_mac: MacAddr) -> Transmit {
    let src_mac = state
        .interfaces
        .by_name(&packet.out_iface)
        .map(|iface| iface.mac)
        .unwrap_or(MacAddr::ZERO);
    EthernetHeader::rewrite_addrs(&mut packet.bytes, src_mac, next_hop_mac);
    Transmit {
        iface: packet.out_iface,
        bytes: packet.bytes,
    }
}

/// Runs one ARP-cache sweep tick: expires stale entries, retransmits or
/// abandons pending requests. Called once a second by the timer thread.
pub fn run_sweep(state: &RouterState, now: Instant) -> Outcome {
    let actions = state.cache.sweep(now);
    let mut outcome = Outcome::drop();

    for action in actions {
        match action {
            SweepAction::Probe { ip, out_iface } => {
                let Some(iface) = state.interfaces.by_name(&out_iface) else {
                    continue;
                };
                state.counters.inc_arp_requests_sent();
                trace!(target = %ip, iface = %out_iface, "retransmitting arp probe");
                outcome.push(Transmit {
                    iface: out_iface,
                    bytes: build_arp_probe(iface, ip),
                });
            }
            SweepAction::Abandon { ip, packets } => {
                state.counters.inc_arp_abandons();
                debug!(ip = %ip, queued = packets.len(), "arp resolution abandoned after max tries");
                outcome = outcome.merge(crate::forwarding::handle_arp_abandon(state, packets, now));
            }
        }
    }

    outcome
}
