//! Startup configuration (§4.11): the interface list and the routing table
//! are each a small whitespace-separated text file, parsed once before any
//! thread is spawned. A malformed line is a startup failure, never a
//! silent default.

use std::collections::HashSet;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use router_core::error::ConfigError;
use router_core::wire::MacAddr;
use router_core::{Interface, InterfaceTable, Route, RoutingTable};

/// Parses the interface file: one `name mac ip` line per interface.
/// Blank lines and lines starting with `#` are ignored.
pub fn load_interfaces(path: &Path) -> Result<InterfaceTable, ConfigError> {
    let file = display_path(path);
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: file.clone(),
        source,
    })?;

    let mut interfaces = Vec::new();
    let mut seen_names = HashSet::new();

    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, mac, ip] = fields.as_slice() else {
            return Err(bad_line(&file, lineno, "expected `name mac ip`", line));
        };

        let mac = parse_mac(mac).ok_or_else(|| bad_line(&file, lineno, "invalid MAC address", line))?;
        let ip: Ipv4Addr = ip
            .parse()
            .map_err(|_| bad_line(&file, lineno, "invalid IPv4 address", line))?;

        if !seen_names.insert(name.to_string()) {
            return Err(ConfigError::DuplicateInterface {
                file: file.clone(),
                name: name.to_string(),
            });
        }

        interfaces.push(Interface {
            name: name.to_string(),
            mac,
            ip,
        });
    }

    Ok(InterfaceTable::new(interfaces))
}

/// Parses the routing table file: one `dest mask gateway iface` line per
/// route. `gateway = 0.0.0.0` marks a directly connected route. Every
/// `iface` named must appear in `interfaces`.
pub fn load_routes(path: &Path, interfaces: &InterfaceTable) -> Result<RoutingTable, ConfigError> {
    let file = display_path(path);
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: file.clone(),
        source,
    })?;

    let mut routes = Vec::new();

    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [dest, mask, gateway, iface] = fields.as_slice() else {
            return Err(bad_line(&file, lineno, "expected `dest mask gateway iface`", line));
        };

        let dest: Ipv4Addr = dest
            .parse()
            .map_err(|_| bad_line(&file, lineno, "invalid destination address", line))?;
        let mask: Ipv4Addr = mask
            .parse()
            .map_err(|_| bad_line(&file, lineno, "invalid subnet mask", line))?;
        let gateway: Ipv4Addr = gateway
            .parse()
            .map_err(|_| bad_line(&file, lineno, "invalid gateway address", line))?;

        if interfaces.by_name(iface).is_none() {
            return Err(ConfigError::UnknownInterface {
                file: file.clone(),
                line: lineno + 1,
                iface: iface.to_string(),
            });
        }

        routes.push(Route {
            dest,
            mask,
            gateway,
            iface_name: iface.to_string(),
        });
    }

    Ok(RoutingTable::new(routes))
}

fn parse_mac(text: &str) -> Option<MacAddr> {
    let mut bytes = [0u8; 6];
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 6 {
        return None;
    }
    for (byte, part) in bytes.iter_mut().zip(parts) {
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    Some(MacAddr::new(bytes))
}

fn bad_line(file: &str, lineno: usize, reason: &'static str, text: &str) -> ConfigError {
    ConfigError::BadLine {
        file: file.to_string(),
        line: lineno + 1,
        reason,
        text: text.to_string(),
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_interfaces_ignoring_comments_and_blanks() {
        let file = write_temp("# comment\n\neth0 aa:aa:aa:aa:aa:01 10.0.0.1\neth1 bb:bb:bb:bb:bb:02 20.0.0.1\n");
        let table = load_interfaces(file.path()).unwrap();
        assert_eq!(table.by_name("eth0").unwrap().ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(table.by_name("eth1").unwrap().mac, MacAddr::new([0xBB, 0xBB, 0xBB, 0xBB, 0xBB, 0x02]));
    }

    #[test]
    fn rejects_duplicate_interface_names() {
        let file = write_temp("eth0 aa:aa:aa:aa:aa:01 10.0.0.1\neth0 bb:bb:bb:bb:bb:02 20.0.0.1\n");
        assert!(matches!(
            load_interfaces(file.path()),
            Err(ConfigError::DuplicateInterface { .. })
        ));
    }

    #[test]
    fn rejects_malformed_line_with_file_and_line_number() {
        let file = write_temp("eth0 not-a-mac 10.0.0.1\n");
        match load_interfaces(file.path()) {
            Err(ConfigError::BadLine { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected BadLine, got {other:?}"),
        }
    }

    #[test]
    fn routes_reject_unknown_interface() {
        let ifaces = InterfaceTable::new(vec![Interface {
            name: "eth0".into(),
            mac: MacAddr::new([0xAA; 6]),
            ip: Ipv4Addr::new(10, 0, 0, 1),
        }]);
        let file = write_temp("20.0.0.0 255.255.255.0 0.0.0.0 eth9\n");
        assert!(matches!(
            load_routes(file.path(), &ifaces),
            Err(ConfigError::UnknownInterface { .. })
        ));
    }

    #[test]
    fn parses_directly_connected_route() {
        let ifaces = InterfaceTable::new(vec![Interface {
            name: "eth0".into(),
            mac: MacAddr::new([0xAA; 6]),
            ip: Ipv4Addr::new(10, 0, 0, 1),
        }]);
        let file = write_temp("10.0.0.0 255.255.255.0 0.0.0.0 eth0\n");
        let table = load_routes(file.path(), &ifaces).unwrap();
        let route = table.lpm(Ipv4Addr::new(10, 0, 0, 5)).unwrap();
        assert!(route.is_directly_connected());
    }
}
