//! ARP packet parsing and construction (RFC 826, Ethernet/IPv4 only).

use std::net::Ipv4Addr;

use super::MacAddr;
use crate::error::WireError;

/// ARP header size for Ethernet/IPv4 (hrd+pro+hln+pln+op+sha+spa+tha+tpa).
pub const ARP_PACKET_LEN: usize = 28;

const ARP_HTYPE_ETHERNET: u16 = 1;
const ARP_PTYPE_IPV4: u16 = 0x0800;

/// ARP operation: request.
pub const ARP_OP_REQUEST: u16 = 1;
/// ARP operation: reply.
pub const ARP_OP_REPLY: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    pub fn parse(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < ARP_PACKET_LEN {
            return Err(WireError::ShortArp { len: data.len() });
        }

        let htype = u16::from_be_bytes([data[0], data[1]]);
        let ptype = u16::from_be_bytes([data[2], data[3]]);
        let hlen = data[4];
        let plen = data[5];
        if htype != ARP_HTYPE_ETHERNET || ptype != ARP_PTYPE_IPV4 || hlen != 6 || plen != 4 {
            return Err(WireError::BadArpAddressFamily { htype, ptype });
        }

        let operation = u16::from_be_bytes([data[6], data[7]]);
        let sender_mac = MacAddr::new(data[8..14].try_into().unwrap());
        let sender_ip = Ipv4Addr::new(data[14], data[15], data[16], data[17]);
        let target_mac = MacAddr::new(data[18..24].try_into().unwrap());
        let target_ip = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        Ok(ArpPacket {
            operation,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        })
    }

    pub fn build(
        operation: u16,
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Vec<u8> {
        let mut packet = Vec::with_capacity(ARP_PACKET_LEN);
        packet.extend_from_slice(&ARP_HTYPE_ETHERNET.to_be_bytes());
        packet.extend_from_slice(&ARP_PTYPE_IPV4.to_be_bytes());
        packet.push(6);
        packet.push(4);
        packet.extend_from_slice(&operation.to_be_bytes());
        packet.extend_from_slice(&sender_mac.octets());
        packet.extend_from_slice(&sender_ip.octets());
        packet.extend_from_slice(&target_mac.octets());
        packet.extend_from_slice(&target_ip.octets());
        packet
    }

    /// Builds the reply to this request: sender/target swapped at L3, our
    /// MAC filling both the new sender field and (implicitly) the Ethernet
    /// source the caller will set.
    pub fn build_reply(&self, our_mac: MacAddr, our_ip: Ipv4Addr) -> Vec<u8> {
        Self::build(ARP_OP_REPLY, our_mac, our_ip, self.sender_mac, self.sender_ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips() {
        let sender_mac = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let sender_ip = Ipv4Addr::new(10, 0, 0, 1);
        let target_ip = Ipv4Addr::new(10, 0, 0, 2);
        let bytes = ArpPacket::build(
            ARP_OP_REQUEST,
            sender_mac,
            sender_ip,
            MacAddr::ZERO,
            target_ip,
        );
        let pkt = ArpPacket::parse(&bytes).unwrap();
        assert_eq!(pkt.operation, ARP_OP_REQUEST);
        assert_eq!(pkt.sender_mac, sender_mac);
        assert_eq!(pkt.sender_ip, sender_ip);
        assert_eq!(pkt.target_ip, target_ip);
    }

    #[test]
    fn parse_rejects_short_packet() {
        let data = [0u8; 27];
        assert_eq!(ArpPacket::parse(&data), Err(WireError::ShortArp { len: 27 }));
    }

    #[test]
    fn reply_swaps_sender_and_target() {
        let req = ArpPacket {
            operation: ARP_OP_REQUEST,
            sender_mac: MacAddr::new([9; 6]),
            sender_ip: Ipv4Addr::new(10, 0, 0, 5),
            target_mac: MacAddr::ZERO,
            target_ip: Ipv4Addr::new(10, 0, 0, 1),
        };
        let our_mac = MacAddr::new([1; 6]);
        let our_ip = Ipv4Addr::new(10, 0, 0, 1);
        let reply = ArpPacket::parse(&req.build_reply(our_mac, our_ip)).unwrap();
        assert_eq!(reply.operation, ARP_OP_REPLY);
        assert_eq!(reply.sender_mac, our_mac);
        assert_eq!(reply.sender_ip, our_ip);
        assert_eq!(reply.target_mac, req.sender_mac);
        assert_eq!(reply.target_ip, req.sender_ip);
    }
}
