//! The ARP timer thread (§4.5): wakes once a second, sweeps the cache, and
//! performs whatever the sweep decided — nothing else runs on this thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use router_core::arp_cache::ARP_RETRY_INTERVAL;
use router_core::RouterState;
use tracing::error;

use crate::link::LinkSender;

pub struct ArpTimer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ArpTimer {
    pub fn spawn(state: Arc<RouterState>, sender: Arc<Mutex<dyn LinkSender + Send>>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                thread::sleep(ARP_RETRY_INTERVAL);
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }

                let outcome = state.on_tick(Instant::now());
                let mut sender = sender.lock().expect("link sender mutex poisoned");
                for transmit in outcome.transmits {
                    if let Err(err) = sender.send(&transmit.iface, &transmit.bytes) {
                        error!(iface = %transmit.iface, %err, "arp timer send failed");
                    }
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the thread to stop and joins it. Called once, from the
    /// shutdown path.
    pub fn stop_and_join(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
