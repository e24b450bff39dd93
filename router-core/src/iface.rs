//! The interface table: a small, immutable list of the router's own
//! interfaces, looked up by name, IP, or MAC.

use std::net::Ipv4Addr;

use crate::wire::MacAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

/// Immutable after construction; the set is small (at most a handful of
/// interfaces) so linear scans are the right tool.
#[derive(Debug, Clone)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    pub fn new(interfaces: Vec<Interface>) -> Self {
        Self { interfaces }
    }

    pub fn by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.ip == ip)
    }

    pub fn by_mac(&self, mac: MacAddr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.mac == mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }
}
