//! The link adapter (§6): the one concrete transport the data-plane core
//! depends on only through a trait. `bind` opens one raw Ethernet channel
//! per named interface via `pnet::datalink` and splits it into a sender
//! half and a receiver half so that sending never has to wait on a
//! blocking receive.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tracing::error;

/// What the data plane needs to send a frame out a named interface. Cheap
/// to share behind a lock: every call is a bounded, non-blocking write.
pub trait LinkSender {
    fn send(&mut self, iface: &str, bytes: &[u8]) -> Result<()>;
}

/// What the data plane needs to receive the next frame plus the interface
/// it arrived on. Never shared: the only caller blocks on it.
pub trait LinkReceiver {
    fn recv(&mut self) -> Result<(String, Vec<u8>)>;
}

/// The send half of a bound link: one `DataLinkSender` per interface name.
pub struct PnetSender {
    senders: HashMap<String, Box<dyn DataLinkSender>>,
}

/// The receive half of a bound link: every interface's `DataLinkReceiver`,
/// polled round-robin.
pub struct PnetReceiver {
    receivers: Vec<(String, Box<dyn DataLinkReceiver>)>,
}

/// Binds a raw datalink channel for each name in `iface_names` and splits
/// it into independent send/receive halves. Fails at startup (never
/// mid-run) if any named interface cannot be found or opened.
pub fn bind(iface_names: &[String]) -> Result<(PnetSender, PnetReceiver)> {
    let available = datalink::interfaces();
    let mut senders = HashMap::new();
    let mut receivers = Vec::new();

    for name in iface_names {
        let nic = find_interface(&available, name)
            .with_context(|| format!("no such network interface: {name}"))?;
        let channel = datalink::channel(&nic, Default::default())
            .with_context(|| format!("failed to open datalink channel on {name}"))?;
        let (tx, rx) = match channel {
            Channel::Ethernet(tx, rx) => (tx, rx),
            _ => return Err(anyhow!("unsupported channel type on {name}")),
        };
        senders.insert(name.clone(), tx);
        receivers.push((name.clone(), rx));
    }

    Ok((PnetSender { senders }, PnetReceiver { receivers }))
}

impl LinkSender for PnetSender {
    fn send(&mut self, iface: &str, bytes: &[u8]) -> Result<()> {
        let sender = self
            .senders
            .get_mut(iface)
            .ok_or_else(|| anyhow!("unknown outbound interface: {iface}"))?;
        match sender.send_to(bytes, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => {
                error!(iface, %err, "link send failed");
                Err(err.into())
            }
            None => Err(anyhow!("link send buffer exhausted on {iface}")),
        }
    }
}

impl LinkReceiver for PnetReceiver {
    /// Polls every bound receiver once in round-robin order and returns the
    /// first frame available. Blocks only as long as the underlying
    /// `pnet` reader blocks on its own interface.
    fn recv(&mut self) -> Result<(String, Vec<u8>)> {
        loop {
            for (name, rx) in &mut self.receivers {
                match rx.next() {
                    Ok(bytes) => return Ok((name.clone(), bytes.to_vec())),
                    Err(err) if err.kind() == std::io::ErrorKind::TimedOut => continue,
                    Err(err) => {
                        error!(iface = %name, %err, "link receive failed");
                        return Err(err.into());
                    }
                }
            }
        }
    }
}

fn find_interface<'a>(interfaces: &'a [NetworkInterface], name: &str) -> Option<&'a NetworkInterface> {
    interfaces.iter().find(|nic| nic.name == name)
}
