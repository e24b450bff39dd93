//! The ARP cache: resolved IP→MAC entries plus the pending-request/retry
//! queue for unresolved next hops.
//!
//! One [`std::sync::Mutex`] guards both the entry map and the pending list.
//! Every method that would touch the link (sending an ARP probe, an ICMP
//! host-unreachable, or a drained packet) returns a plain value describing
//! what the caller should do instead of doing it itself — the lock is never
//! held across a transmit.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::wire::MacAddr;

pub const ARP_CACHE_TIMEOUT: Duration = Duration::from_secs(15);
pub const ARP_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const ARP_MAX_TRIES: u8 = 5;

#[derive(Debug, Clone)]
struct ArpEntry {
    mac: MacAddr,
    inserted_at: Instant,
}

/// A single owned copy of a frame waiting on ARP resolution.
#[derive(Debug, Clone)]
pub struct PendingPacket {
    pub bytes: Vec<u8>,
    pub out_iface: String,
}

#[derive(Debug)]
pub struct PendingRequest {
    pub ip: Ipv4Addr,
    pub out_iface: String,
    pub packets: VecDeque<PendingPacket>,
    pub sent_count: u8,
    pub last_sent_at: Instant,
}

/// An action the cache has decided on but cannot perform itself, because
/// performing it means touching the link.
#[derive(Debug)]
pub enum SweepAction {
    /// Retransmit an ARP request for `ip` out `out_iface`.
    Probe { ip: Ipv4Addr, out_iface: String },
    /// Five probes went unanswered: drop the request and tell the caller
    /// to synthesize ICMP host-unreachable for every queued packet.
    Abandon { ip: Ipv4Addr, packets: Vec<PendingPacket> },
}

pub type SweepActions = Vec<SweepAction>;

#[derive(Default)]
struct Inner {
    entries: HashMap<Ipv4Addr, ArpEntry>,
    pending: HashMap<Ipv4Addr, PendingRequest>,
}

#[derive(Default)]
pub struct ArpCache {
    inner: Mutex<Inner>,
}

impl ArpCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the MAC for `ip` if an unexpired entry exists.
    pub fn lookup(&self, ip: Ipv4Addr, now: Instant) -> Option<MacAddr> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(&ip).and_then(|entry| {
            if now.duration_since(entry.inserted_at) < ARP_CACHE_TIMEOUT {
                Some(entry.mac)
            } else {
                None
            }
        })
    }

    /// Inserts/refreshes the entry for `ip` and removes+returns any
    /// [`PendingRequest`] waiting on it, for the caller to drain.
    pub fn insert(&self, ip: Ipv4Addr, mac: MacAddr, now: Instant) -> Option<PendingRequest> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(ip, ArpEntry { mac, inserted_at: now });
        inner.pending.remove(&ip)
    }

    /// Queues `bytes` for delivery once `ip` resolves. If no request was
    /// already pending for `ip`, one is created and marked as having just
    /// sent its first probe (`sent_count = 1`); the caller is responsible
    /// for actually transmitting that first probe, since this call must not
    /// touch the link. Returns `true` when the caller must send that first
    /// probe.
    pub fn queue(&self, ip: Ipv4Addr, bytes: Vec<u8>, out_iface: String, now: Instant) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let is_new = !inner.pending.contains_key(&ip);

        let request = inner.pending.entry(ip).or_insert_with(|| PendingRequest {
            ip,
            out_iface: out_iface.clone(),
            packets: VecDeque::new(),
            sent_count: 0,
            last_sent_at: now,
        });
        request.packets.push_back(PendingPacket { bytes, out_iface });

        if is_new {
            request.sent_count = 1;
            request.last_sent_at = now;
        }

        is_new
    }

    /// Called once per tick by the timer task. Computes a plan of actions
    /// and releases the lock before returning it; the caller executes the
    /// plan against the link.
    pub fn sweep(&self, now: Instant) -> SweepActions {
        let mut actions = Vec::new();
        let mut inner = self.inner.lock().unwrap();

        inner
            .entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ARP_CACHE_TIMEOUT);

        let due: Vec<Ipv4Addr> = inner
            .pending
            .iter()
            .filter(|(_, req)| now.duration_since(req.last_sent_at) >= ARP_RETRY_INTERVAL)
            .map(|(ip, _)| *ip)
            .collect();

        for ip in due {
            let abandon = {
                let req = inner.pending.get(&ip).expect("checked present above");
                req.sent_count >= ARP_MAX_TRIES
            };

            if abandon {
                let req = inner.pending.remove(&ip).expect("checked present above");
                actions.push(SweepAction::Abandon {
                    ip,
                    packets: req.packets.into_iter().collect(),
                });
            } else {
                let req = inner.pending.get_mut(&ip).expect("checked present above");
                req.sent_count += 1;
                req.last_sent_at = now;
                actions.push(SweepAction::Probe {
                    ip,
                    out_iface: req.out_iface.clone(),
                });
            }
        }

        actions
    }

    /// Number of pending requests, for tests/diagnostics.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(b: u8) -> MacAddr {
        MacAddr::new([b; 6])
    }

    #[test]
    fn lookup_misses_on_empty_cache() {
        let cache = ArpCache::new();
        assert!(cache.lookup(Ipv4Addr::new(10, 0, 0, 1), Instant::now()).is_none());
    }

    #[test]
    fn insert_then_lookup_hits() {
        let cache = ArpCache::new();
        let now = Instant::now();
        cache.insert(Ipv4Addr::new(10, 0, 0, 1), mac(1), now);
        assert_eq!(
            cache.lookup(Ipv4Addr::new(10, 0, 0, 1), now),
            Some(mac(1))
        );
    }

    #[test]
    fn entry_expires_after_timeout() {
        let cache = ArpCache::new();
        let t0 = Instant::now();
        cache.insert(Ipv4Addr::new(10, 0, 0, 1), mac(1), t0);
        let later = t0 + ARP_CACHE_TIMEOUT;
        assert!(cache.lookup(Ipv4Addr::new(10, 0, 0, 1), later).is_none());
    }

    #[test]
    fn first_queue_reports_new_and_subsequent_dont() {
        let cache = ArpCache::new();
        let now = Instant::now();
        let ip = Ipv4Addr::new(20, 0, 0, 5);
        assert!(cache.queue(ip, vec![1], "eth1".into(), now));
        assert!(!cache.queue(ip, vec![2], "eth1".into(), now));
        assert_eq!(cache.pending_count(), 1);
    }

    #[test]
    fn at_most_one_pending_request_per_ip() {
        // P4
        let cache = ArpCache::new();
        let now = Instant::now();
        let ip = Ipv4Addr::new(20, 0, 0, 5);
        for i in 0..10 {
            cache.queue(ip, vec![i], "eth1".into(), now);
        }
        assert_eq!(cache.pending_count(), 1);
    }

    #[test]
    fn insert_drains_pending_request() {
        // P6 (drain mechanics; ordering is asserted by the caller using the
        // returned VecDeque, which preserves insertion order)
        let cache = ArpCache::new();
        let now = Instant::now();
        let ip = Ipv4Addr::new(20, 0, 0, 5);
        cache.queue(ip, vec![1], "eth1".into(), now);
        cache.queue(ip, vec![2], "eth1".into(), now);

        let drained = cache.insert(ip, mac(9), now).expect("pending existed");
        let bytes: Vec<_> = drained.packets.iter().map(|p| p.bytes.clone()).collect();
        assert_eq!(bytes, vec![vec![1], vec![2]]);
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn sweep_does_nothing_before_retry_interval_elapses() {
        let cache = ArpCache::new();
        let now = Instant::now();
        let ip = Ipv4Addr::new(20, 0, 0, 5);
        cache.queue(ip, vec![1], "eth1".into(), now);
        let actions = cache.sweep(now + Duration::from_millis(500));
        assert!(actions.is_empty());
    }

    #[test]
    fn sweep_retries_up_to_five_times_then_abandons() {
        // P5
        let cache = ArpCache::new();
        let t0 = Instant::now();
        let ip = Ipv4Addr::new(20, 0, 0, 5);
        cache.queue(ip, vec![1], "eth1".into(), t0);

        let mut probes = 0;
        let mut abandoned_packets = None;
        for tick in 1..=6u32 {
            let now = t0 + ARP_RETRY_INTERVAL * tick;
            for action in cache.sweep(now) {
                match action {
                    SweepAction::Probe { .. } => probes += 1,
                    SweepAction::Abandon { packets, .. } => abandoned_packets = Some(packets),
                }
            }
        }

        assert_eq!(probes, 4, "first probe was sent eagerly by queue(), sweep adds 4 more");
        let packets = abandoned_packets.expect("request should have been abandoned");
        assert_eq!(packets.len(), 1);
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn reply_preempts_further_retransmits() {
        let cache = ArpCache::new();
        let t0 = Instant::now();
        let ip = Ipv4Addr::new(20, 0, 0, 5);
        cache.queue(ip, vec![1], "eth1".into(), t0);
        cache.insert(ip, mac(1), t0 + Duration::from_millis(200));

        let actions = cache.sweep(t0 + ARP_RETRY_INTERVAL * 2);
        assert!(actions.is_empty());
    }
}
