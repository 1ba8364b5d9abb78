use std::time::Duration;

use socket2::SockAddr;

use crate::infrastructure::{RetransmitScheduler, TimerId};
use crate::packet::{Packet, SequenceNumber};

/// One entry of a send or receive buffer: the packet, its peer address and its retransmission timer.
///
/// The timer is owned by the slot. It has to be stopped before the slot is dropped or
/// overwritten, which `SendWindow` does for every slot it evicts.
#[derive(Debug)]
pub struct PacketSlot {
    packet: Packet,
    address: SockAddr,
    timer: Option<TimerId>,
    acknowledged: bool,
    transmissions: u32,
}

impl PacketSlot {
    /// Creates a slot for a packet that was just sent to, or received from, `address`.
    pub fn new(packet: Packet, address: SockAddr) -> Self {
        PacketSlot {
            packet,
            address,
            timer: None,
            acknowledged: false,
            transmissions: 1,
        }
    }

    /// Returns the stored packet.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// Returns the destination (send side) or source (receive side) address.
    pub fn address(&self) -> &SockAddr {
        &self.address
    }

    /// Returns the sequence number of the stored packet.
    pub fn sequence(&self) -> SequenceNumber {
        self.packet.sequence()
    }

    /// Returns true once an acknowledgment for this packet arrived.
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Returns how often the packet was put on the wire.
    pub fn transmissions(&self) -> u32 {
        self.transmissions
    }

    /// Returns the currently armed timer.
    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Returns true while a retransmission timer is armed.
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Arms a fresh timer, replacing a previous one.
    pub fn start_timer(&mut self, timers: &impl RetransmitScheduler, after: Duration) {
        self.stop_timer(timers);
        self.timer = Some(timers.arm(self.sequence(), after));
    }

    /// Disarms the timer, if any.
    pub fn stop_timer(&mut self, timers: &impl RetransmitScheduler) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
    }

    /// Marks the packet as acknowledged and disarms its timer.
    pub fn acknowledge(&mut self, timers: &impl RetransmitScheduler) {
        self.acknowledged = true;
        self.stop_timer(timers);
    }

    /// Records that the packet was put on the wire again.
    pub fn record_retransmission(&mut self) {
        self.transmissions += 1;
    }
}
