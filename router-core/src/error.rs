use thiserror::Error;

/// Failure to parse or validate a wire-format header.
///
/// Every variant corresponds to a single frame being dropped; none of these
/// ever unwind past the dispatcher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("frame shorter than an Ethernet header ({len} < 14 bytes)")]
    ShortFrame { len: usize },

    #[error("IPv4 header truncated (need {need} bytes, have {have})")]
    ShortIpv4Header { need: usize, have: usize },

    #[error("unsupported IP version {version}")]
    BadVersion { version: u8 },

    #[error("IHL {ihl} out of range 5..=15")]
    BadIhl { ihl: u8 },

    #[error("IPv4 total length {total_len} inconsistent with frame/header bounds ({have} bytes)")]
    BadTotalLength { total_len: u16, have: usize },

    #[error("IPv4 header checksum mismatch (stored {stored:#06x}, computed {computed:#06x})")]
    BadChecksum { stored: u16, computed: u16 },

    #[error("ICMP message shorter than its 8-byte header ({len} < 8 bytes)")]
    ShortIcmp { len: usize },

    #[error("ICMP checksum mismatch (stored {stored:#06x}, computed {computed:#06x})")]
    BadIcmpChecksum { stored: u16, computed: u16 },

    #[error("ARP packet shorter than 28 bytes ({len} < 28)")]
    ShortArp { len: usize },

    #[error("unsupported ARP hardware/protocol combination (htype={htype}, ptype={ptype:#06x})")]
    BadArpAddressFamily { htype: u16, ptype: u16 },
}

/// Failure parsing a startup configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{file}:{line}: {reason}: {text:?}")]
    BadLine {
        file: String,
        line: usize,
        reason: &'static str,
        text: String,
    },

    #[error("{file}: duplicate interface name {name:?}")]
    DuplicateInterface { file: String, name: String },

    #[error("routing table references unknown interface {iface:?} ({file}:{line})")]
    UnknownInterface {
        file: String,
        line: usize,
        iface: String,
    },

    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}
