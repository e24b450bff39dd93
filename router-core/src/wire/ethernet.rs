//! Ethernet II frame parsing and construction (IEEE 802.3, no VLAN tag).

use super::MacAddr;
use crate::error::WireError;

/// Ethernet header size.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// EtherType for IPv4.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// EtherType for ARP.
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// A parsed Ethernet header; `payload` borrows the remainder of the frame.
#[derive(Debug)]
pub struct EthernetHeader<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    pub payload: &'a [u8],
}

impl<'a> EthernetHeader<'a> {
    /// Parse an Ethernet header from the start of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self, WireError> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err(WireError::ShortFrame { len: data.len() });
        }

        let dst = MacAddr::new(data[0..6].try_into().unwrap());
        let src = MacAddr::new(data[6..12].try_into().unwrap());
        let ethertype = u16::from_be_bytes([data[12], data[13]]);

        Ok(EthernetHeader {
            dst,
            src,
            ethertype,
            payload: &data[ETHERNET_HEADER_LEN..],
        })
    }

    /// Serialize an Ethernet header followed by `payload` into a fresh buffer.
    pub fn build(src: MacAddr, dst: MacAddr, ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(ETHERNET_HEADER_LEN + payload.len());
        frame.extend_from_slice(&dst.octets());
        frame.extend_from_slice(&src.octets());
        frame.extend_from_slice(&ethertype.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Overwrite the source/destination MAC fields of an already-built frame
    /// in place. Used by the send path, which builds the IPv4/ICMP payload
    /// before the next-hop MAC is known.
    pub fn rewrite_addrs(frame: &mut [u8], src: MacAddr, dst: MacAddr) {
        frame[0..6].copy_from_slice(&dst.octets());
        frame[6..12].copy_from_slice(&src.octets());
    }
}
