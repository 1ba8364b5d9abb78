//! This module provides a way to simulate a lossy link. Packets are randomly dropped or
//! duplicated on their way out.
//!
//! Meant for testing and for the tester binary, a production socket does not carry one.

use std::sync::{Arc, Mutex, PoisonError};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Network simulator. Used to simulate network conditions such as dropped and duplicated packets.
#[derive(Debug, Clone)]
pub struct LinkConditioner {
    // Value between 0 and 1, the chance a packet will be dropped on sending
    packet_loss: f64,
    // Value between 0 and 1, the chance a sent packet goes out twice
    duplication: f64,
    random: Arc<Mutex<Pcg64Mcg>>,
}

impl LinkConditioner {
    /// Creates and returns a LinkConditioner with a random seed.
    pub fn new() -> LinkConditioner {
        LinkConditioner::with_seed(rand::random())
    }

    /// Creates a LinkConditioner whose decisions are reproducible for a given `seed`.
    pub fn with_seed(seed: u64) -> LinkConditioner {
        LinkConditioner {
            packet_loss: 0.0,
            duplication: 0.0,
            random: Arc::new(Mutex::new(Pcg64Mcg::seed_from_u64(seed))),
        }
    }

    /// Sets the packet loss rate of Link Conditioner, clamped to `0.0..=1.0`.
    pub fn set_packet_loss(&mut self, rate: f64) {
        self.packet_loss = rate.clamp(0.0, 1.0);
    }

    /// Sets the packet duplication rate of Link Conditioner, clamped to `0.0..=1.0`.
    pub fn set_duplication(&mut self, rate: f64) {
        self.duplication = rate.clamp(0.0, 1.0);
    }

    /// Returns how many copies of the next packet go on the wire: 0 if it is lost, 2 if it is duplicated.
    pub fn copies(&self) -> usize {
        let mut random = self.random.lock().unwrap_or_else(PoisonError::into_inner);
        if random.gen_bool(self.packet_loss) {
            0
        } else if random.gen_bool(self.duplication) {
            2
        } else {
            1
        }
    }

    /// Function that checks to see if a packet should be sent or dropped.
    pub fn should_send(&self) -> bool {
        self.copies() > 0
    }
}

impl Default for LinkConditioner {
    fn default() -> Self {
        Self::new()
    }
}
