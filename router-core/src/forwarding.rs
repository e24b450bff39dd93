//! The forwarding engine (§4.6): validates inbound IPv4 datagrams, decides
//! between local delivery and forwarding, and owns the send path (§4.8)
//! that every outbound IPv4 datagram — forwarded or self-originated —
//! passes through on its way to the link.

use std::net::Ipv4Addr;
use std::time::Instant;

use tracing::{debug, trace};

use crate::arp_cache::PendingPacket;
use crate::iface::Interface;
use crate::icmp_responder::{self, ErrorKind};
use crate::route::Route;
use crate::state::{Outcome, RouterState, Transmit};
use crate::wire::ethernet::{EthernetHeader, ETHERNET_HEADER_LEN, ETHERTYPE_IPV4};
use crate::wire::icmp::{self, IcmpHeader};
use crate::wire::ipv4::{Ipv4Header, PROTOCOL_ICMP, PROTOCOL_TCP, PROTOCOL_UDP};
use crate::wire::MacAddr;

/// Handles an IPv4 payload (Ethernet header still attached to `frame`, at
/// offset 0, so the wire codec's `header_offset` arithmetic lines up).
pub fn handle_ipv4(state: &RouterState, in_iface: &str, frame: &[u8], now: Instant) -> Outcome {
    let ip = match Ipv4Header::parse(frame, ETHERNET_HEADER_LEN) {
        Ok(ip) => ip,
        Err(err) => {
            state.counters.inc_frames_dropped_malformed();
            trace!(iface = in_iface, ?err, "dropping malformed ipv4 datagram");
            return Outcome::drop();
        }
    };

    if is_broadcast_or_multicast(ip.dst) {
        trace!(dst = %ip.dst, "dropping broadcast/multicast destination");
        return Outcome::drop();
    }

    if let Some(local) = state.interfaces.by_ip(ip.dst) {
        return deliver_locally(state, local, &ip, frame, now);
    }

    forward(state, &ip, frame, now)
}

/// `255.255.255.255`, or anything in the class-D/E range `224.0.0.0/4` and
/// above. Per-interface directed broadcasts are not detected: `Interface`
/// (§3) carries no subnet mask, only a bare IP, so there is nothing to
/// compute a directed broadcast address against.
fn is_broadcast_or_multicast(dst: Ipv4Addr) -> bool {
    dst == Ipv4Addr::BROADCAST || dst.octets()[0] >= 224
}

fn deliver_locally(
    state: &RouterState,
    local: &Interface,
    ip: &Ipv4Header,
    frame: &[u8],
    now: Instant,
) -> Outcome {
    match ip.protocol {
        PROTOCOL_ICMP => handle_icmp(state, ip, now),
        PROTOCOL_TCP | PROTOCOL_UDP => {
            state.counters.inc_icmp_port_unreachable();
            let offending = &frame[ETHERNET_HEADER_LEN..];
            let datagram = icmp_responder::error_datagram(
                ErrorKind::PortUnreachable,
                offending,
                local.ip,
                ip.src,
            );
            debug!(src = %ip.src, dst = %ip.dst, protocol = ip.protocol, "port unreachable");
            route_and_send(state, datagram, ip.src, now)
        }
        other => {
            trace!(protocol = other, "dropping datagram addressed to router, unhandled protocol");
            Outcome::drop()
        }
    }
}

fn handle_icmp(state: &RouterState, ip: &Ipv4Header, now: Instant) -> Outcome {
    let incoming = match IcmpHeader::parse(ip.payload) {
        Ok(icmp) => icmp,
        Err(err) => {
            state.counters.inc_frames_dropped_malformed();
            trace!(?err, "dropping malformed icmp message");
            return Outcome::drop();
        }
    };

    if incoming.icmp_type != icmp::TYPE_ECHO_REQUEST || incoming.code != icmp::CODE_ECHO {
        trace!(icmp_type = incoming.icmp_type, "ignoring non-echo icmp addressed to router");
        return Outcome::drop();
    }

    state.counters.inc_icmp_echo_reply();
    let datagram = icmp_responder::echo_reply_datagram(ip, &incoming);
    debug!(to = %ip.src, "replying to echo request");
    route_and_send(state, datagram, ip.src, now)
}

fn forward(state: &RouterState, ip: &Ipv4Header, frame: &[u8], now: Instant) -> Outcome {
    let mut owned = frame.to_vec();
    let new_ttl = Ipv4Header::decrement_ttl_and_reframe(&mut owned, ip.header_offset, ip.header_len());

    if new_ttl == 0 {
        state.counters.inc_icmp_time_exceeded();
        let offending = &frame[ETHERNET_HEADER_LEN..];
        debug!(src = %ip.src, dst = %ip.dst, "ttl expired in transit");
        return respond_with_icmp_error(state, ErrorKind::TimeExceeded, offending, ip.src, None, now);
    }

    let Some(route) = state.routing_table.lpm(ip.dst).cloned() else {
        state.counters.inc_icmp_net_unreachable();
        let offending = &frame[ETHERNET_HEADER_LEN..];
        debug!(dst = %ip.dst, "no route, net unreachable");
        return respond_with_icmp_error(state, ErrorKind::NetUnreachable, offending, ip.src, None, now);
    };

    let Some(out_iface) = state.interfaces.by_name(&route.iface_name) else {
        state.counters.inc_icmp_net_unreachable();
        return Outcome::drop();
    };

    let next_hop = next_hop_for(&route, ip.dst);
    state.counters.inc_frames_forwarded();
    debug!(src = %ip.src, dst = %ip.dst, iface = %route.iface_name, next_hop = %next_hop, "forwarding");
    send_path(state, owned[ETHERNET_HEADER_LEN..].to_vec(), out_iface, next_hop, now)
}

fn next_hop_for(route: &Route, dst: Ipv4Addr) -> Ipv4Addr {
    if route.is_directly_connected() {
        dst
    } else {
        route.gateway
    }
}

/// Routes an IPv4 datagram (`ip_bytes`, no Ethernet framing) to `dst` by
/// LPM and hands it to the send path. Used for self-originated datagrams
/// whose source address is already fixed (echo replies).
fn route_and_send(state: &RouterState, ip_bytes: Vec<u8>, dst: Ipv4Addr, now: Instant) -> Outcome {
    let Some(route) = state.routing_table.lpm(dst) else {
        return Outcome::drop();
    };
    let Some(out_iface) = state.interfaces.by_name(&route.iface_name) else {
        return Outcome::drop();
    };
    let next_hop = next_hop_for(route, dst);
    send_path(state, ip_bytes, out_iface, next_hop, now)
}

/// Routes and builds an ICMP error datagram whose source address is either
/// `fixed_src` (port unreachable, per §4.7) or the chosen out-interface's
/// own IP (every other error, per §4.7).
fn respond_with_icmp_error(
    state: &RouterState,
    kind: ErrorKind,
    offending: &[u8],
    dst: Ipv4Addr,
    fixed_src: Option<Ipv4Addr>,
    now: Instant,
) -> Outcome {
    let Some(route) = state.routing_table.lpm(dst) else {
        return Outcome::drop();
    };
    let Some(out_iface) = state.interfaces.by_name(&route.iface_name) else {
        return Outcome::drop();
    };
    let src = fixed_src.unwrap_or(out_iface.ip);
    let datagram = icmp_responder::error_datagram(kind, offending, src, dst);
    let next_hop = next_hop_for(route, dst);
    send_path(state, datagram, out_iface, next_hop, now)
}

/// §4.8: resolve `next_hop` and either transmit immediately or queue the
/// packet behind a pending ARP request, probing on first queue.
fn send_path(
    state: &RouterState,
    ip_bytes: Vec<u8>,
    out_iface: &Interface,
    next_hop: Ipv4Addr,
    now: Instant,
) -> Outcome {
    let frame = EthernetHeader::build(out_iface.mac, MacAddr::ZERO, ETHERTYPE_IPV4, &ip_bytes);

    if let Some(mac) = state.cache.lookup(next_hop, now) {
        let mut frame = frame;
        EthernetHeader::rewrite_addrs(&mut frame, out_iface.mac, mac);
        return Outcome::single(Transmit {
            iface: out_iface.name.clone(),
            bytes: frame,
        });
    }

    let is_new = state
        .cache
        .queue(next_hop, frame, out_iface.name.clone(), now);

    let mut outcome = Outcome::drop();
    if is_new {
        state.counters.inc_arp_requests_sent();
        outcome.push(Transmit {
            iface: out_iface.name.clone(),
            bytes: crate::arp_handler::build_arp_probe(out_iface, next_hop),
        });
    }
    outcome
}

/// §4.9/§4.7: five unanswered ARP probes abandon the pending request; every
/// queued packet yields one ICMP host-unreachable back to its own sender.
pub(crate) fn handle_arp_abandon(state: &RouterState, packets: Vec<PendingPacket>, now: Instant) -> Outcome {
    let mut outcome = Outcome::drop();

    for packet in packets {
        let Ok(queued_ip) = Ipv4Header::parse(&packet.bytes, ETHERNET_HEADER_LEN) else {
            continue;
        };
        state.counters.inc_icmp_host_unreachable();
        let offending = &packet.bytes[ETHERNET_HEADER_LEN..];
        outcome = outcome.merge(respond_with_icmp_error(
            state,
            ErrorKind::HostUnreachable,
            offending,
            queued_ip.src,
            None,
            now,
        ));
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::InterfaceTable;
    use crate::route::RoutingTable;
    use crate::wire::ipv4::{Ipv4Header as Hdr, PROTOCOL_ICMP as ICMP};
    use std::net::Ipv4Addr;

    fn interfaces() -> InterfaceTable {
        InterfaceTable::new(vec![
            Interface {
                name: "eth0".into(),
                mac: MacAddr::new([0xAA; 6]),
                ip: Ipv4Addr::new(10, 0, 0, 1),
            },
            Interface {
                name: "eth1".into(),
                mac: MacAddr::new([0xBB; 6]),
                ip: Ipv4Addr::new(20, 0, 0, 1),
            },
        ])
    }

    fn routes() -> RoutingTable {
        RoutingTable::new(vec![
            Route {
                dest: Ipv4Addr::new(10, 0, 0, 0),
                mask: Ipv4Addr::new(255, 255, 255, 0),
                gateway: Ipv4Addr::UNSPECIFIED,
                iface_name: "eth0".into(),
            },
            Route {
                dest: Ipv4Addr::new(20, 0, 0, 0),
                mask: Ipv4Addr::new(255, 255, 255, 0),
                gateway: Ipv4Addr::UNSPECIFIED,
                iface_name: "eth1".into(),
            },
        ])
    }

    fn echo_request_frame(src: Ipv4Addr, dst: Ipv4Addr, ttl: u8) -> Vec<u8> {
        let mut icmp_bytes = vec![icmp::TYPE_ECHO_REQUEST, icmp::CODE_ECHO, 0, 0, 0, 1, 0, 1];
        icmp_bytes.extend_from_slice(b"ping");
        let csum = crate::wire::internet_checksum(&icmp_bytes);
        icmp_bytes[2] = (csum >> 8) as u8;
        icmp_bytes[3] = (csum & 0xFF) as u8;
        let ip = Hdr::build(9, ttl, ICMP, src, dst, &icmp_bytes);
        let mut frame = EthernetHeader::build(
            MacAddr::new([1, 1, 1, 1, 1, 1]),
            MacAddr::new([0xAA; 6]),
            ETHERTYPE_IPV4,
            &ip,
        );
        frame.truncate(ETHERNET_HEADER_LEN + ip.len());
        frame
    }

    #[test]
    fn forwards_and_decrements_ttl_then_queues_arp_probe() {
        let state = RouterState::new(interfaces(), routes());
        let frame = echo_request_frame(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(20, 0, 0, 9),
            64,
        );
        let outcome = handle_ipv4(&state, "eth0", &frame, Instant::now());
        assert_eq!(outcome.transmits.len(), 1);
        let sent = &outcome.transmits[0];
        assert_eq!(sent.iface, "eth1");
        let hdr = EthernetHeader::parse(&sent.bytes).unwrap();
        assert_eq!(hdr.ethertype, crate::wire::ethernet::ETHERTYPE_ARP);
        assert_eq!(state.counters.snapshot().frames_forwarded, 1);
    }

    #[test]
    fn ttl_one_yields_time_exceeded_back_to_sender() {
        let state = RouterState::new(interfaces(), routes());
        let now = Instant::now();
        state.cache.insert(Ipv4Addr::new(10, 0, 0, 5), MacAddr::new([9; 6]), now);
        let frame = echo_request_frame(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(20, 0, 0, 9),
            1,
        );
        let outcome = handle_ipv4(&state, "eth0", &frame, now);
        assert_eq!(outcome.transmits.len(), 1);
        let reply = &outcome.transmits[0];
        assert_eq!(reply.iface, "eth0");
        let eth = EthernetHeader::parse(&reply.bytes).unwrap();
        let ip = Hdr::parse(eth.payload, 0).unwrap();
        let icmp = IcmpHeader::parse(ip.payload).unwrap();
        assert_eq!(icmp.icmp_type, icmp::TYPE_TIME_EXCEEDED);
        assert_eq!(state.counters.snapshot().icmp_time_exceeded, 1);
    }

    #[test]
    fn no_route_yields_net_unreachable() {
        let state = RouterState::new(interfaces(), routes());
        let frame = echo_request_frame(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(30, 0, 0, 9),
            64,
        );
        let outcome = handle_ipv4(&state, "eth0", &frame, Instant::now());
        assert_eq!(state.counters.snapshot().icmp_net_unreachable, 1);
        assert_eq!(outcome.transmits.len(), 1);
    }

    #[test]
    fn echo_to_router_itself_replies_directly() {
        let state = RouterState::new(interfaces(), routes());
        let frame = echo_request_frame(
            Ipv4Addr::new(20, 0, 0, 9),
            Ipv4Addr::new(20, 0, 0, 1),
            64,
        );
        let outcome = handle_ipv4(&state, "eth1", &frame, Instant::now());
        assert_eq!(outcome.transmits.len(), 1);
        assert_eq!(state.counters.snapshot().icmp_echo_reply, 1);
    }
}
