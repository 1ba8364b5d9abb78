//! Helpers shared by the unit tests: an in-memory network and a scheduler that records timers
//! instead of running them.

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use socket2::SockAddr;

use crate::infrastructure::{RetransmitScheduler, TimerId};
use crate::packet::SequenceNumber;

pub use self::network_emulator::{EmulatedSocket, NetworkEmulator};

mod network_emulator;

/// Returns a loopback address with the given port.
pub fn address(port: u16) -> SockAddr {
    SocketAddr::from(([127, 0, 0, 1], port)).into()
}

#[derive(Debug, Default)]
struct FakeTimers {
    generation: u64,
    armed: HashSet<TimerId>,
    cancelled: Vec<TimerId>,
}

/// A `RetransmitScheduler` that never fires, it only keeps track of what is armed.
#[derive(Debug, Default)]
pub struct FakeScheduler {
    timers: Mutex<FakeTimers>,
}

impl FakeScheduler {
    /// Returns all timers cancelled so far, in order.
    pub fn cancelled(&self) -> Vec<TimerId> {
        self.lock().cancelled.clone()
    }

    /// Returns the number of timers armed and not cancelled.
    pub fn armed_count(&self) -> usize {
        self.lock().armed.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeTimers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RetransmitScheduler for FakeScheduler {
    fn arm(&self, sequence: SequenceNumber, _after: Duration) -> TimerId {
        let mut timers = self.lock();
        timers.generation += 1;
        let id = TimerId::new(sequence, timers.generation);
        timers.armed.insert(id);
        id
    }

    fn cancel(&self, id: TimerId) {
        let mut timers = self.lock();
        timers.armed.remove(&id);
        timers.cancelled.push(id);
    }
}
