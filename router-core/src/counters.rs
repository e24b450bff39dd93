//! Countable events, independently atomic so no mutex is needed to read or
//! update them from either the receive thread or the timer thread.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    pub frames_in: AtomicU64,
    pub frames_dropped_malformed: AtomicU64,
    pub frames_forwarded: AtomicU64,
    pub icmp_echo_reply: AtomicU64,
    pub icmp_time_exceeded: AtomicU64,
    pub icmp_net_unreachable: AtomicU64,
    pub icmp_host_unreachable: AtomicU64,
    pub icmp_port_unreachable: AtomicU64,
    pub arp_requests_sent: AtomicU64,
    pub arp_replies_sent: AtomicU64,
    pub arp_resolutions: AtomicU64,
    pub arp_abandons: AtomicU64,
}

/// A point-in-time, plain-`u64` copy of [`Counters`] for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub frames_in: u64,
    pub frames_dropped_malformed: u64,
    pub frames_forwarded: u64,
    pub icmp_echo_reply: u64,
    pub icmp_time_exceeded: u64,
    pub icmp_net_unreachable: u64,
    pub icmp_host_unreachable: u64,
    pub icmp_port_unreachable: u64,
    pub arp_requests_sent: u64,
    pub arp_replies_sent: u64,
    pub arp_resolutions: u64,
    pub arp_abandons: u64,
}

macro_rules! bump {
    ($self:ident, $field:ident) => {
        $self.$field.fetch_add(1, Ordering::Relaxed)
    };
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_frames_in(&self) {
        bump!(self, frames_in);
    }

    pub fn inc_frames_dropped_malformed(&self) {
        bump!(self, frames_dropped_malformed);
    }

    pub fn inc_frames_forwarded(&self) {
        bump!(self, frames_forwarded);
    }

    pub fn inc_icmp_echo_reply(&self) {
        bump!(self, icmp_echo_reply);
    }

    pub fn inc_icmp_time_exceeded(&self) {
        bump!(self, icmp_time_exceeded);
    }

    pub fn inc_icmp_net_unreachable(&self) {
        bump!(self, icmp_net_unreachable);
    }

    pub fn inc_icmp_host_unreachable(&self) {
        bump!(self, icmp_host_unreachable);
    }

    pub fn inc_icmp_port_unreachable(&self) {
        bump!(self, icmp_port_unreachable);
    }

    pub fn inc_arp_requests_sent(&self) {
        bump!(self, arp_requests_sent);
    }

    pub fn inc_arp_replies_sent(&self) {
        bump!(self, arp_replies_sent);
    }

    pub fn inc_arp_resolutions(&self) {
        bump!(self, arp_resolutions);
    }

    pub fn inc_arp_abandons(&self) {
        bump!(self, arp_abandons);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_dropped_malformed: self.frames_dropped_malformed.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            icmp_echo_reply: self.icmp_echo_reply.load(Ordering::Relaxed),
            icmp_time_exceeded: self.icmp_time_exceeded.load(Ordering::Relaxed),
            icmp_net_unreachable: self.icmp_net_unreachable.load(Ordering::Relaxed),
            icmp_host_unreachable: self.icmp_host_unreachable.load(Ordering::Relaxed),
            icmp_port_unreachable: self.icmp_port_unreachable.load(Ordering::Relaxed),
            arp_requests_sent: self.arp_requests_sent.load(Ordering::Relaxed),
            arp_replies_sent: self.arp_replies_sent.load(Ordering::Relaxed),
            arp_resolutions: self.arp_resolutions.load(Ordering::Relaxed),
            arp_abandons: self.arp_abandons.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let counters = Counters::new();
        counters.inc_frames_in();
        counters.inc_frames_in();
        counters.inc_arp_abandons();
        let snap = counters.snapshot();
        assert_eq!(snap.frames_in, 2);
        assert_eq!(snap.arp_abandons, 1);
        assert_eq!(snap.frames_forwarded, 0);
    }
}
