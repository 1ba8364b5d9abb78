use std::time::Duration;

use socket2::SockAddr;

use crate::config::{Config, RetransmitStrategy};
use crate::error::{ErrorKind, Result};
use crate::net::constants::INITIAL_SEQUENCE;
use crate::packet::{Packet, SequenceNumber};
use crate::sequence_buffer::{sequence_less_than, PacketSlot, SequenceBuffer};

use super::{RetransmitScheduler, TimerId};

/// What an incoming acknowledgment did to the send window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgment {
    /// The base was acknowledged and the window slid forward to `send_base`.
    Advanced {
        /// The new oldest unacknowledged sequence number.
        send_base: SequenceNumber,
    },
    /// A packet other than the base was acknowledged, the base did not move.
    Selective,
    /// The packet was already acknowledged or lies outside the window.
    Ignored,
}

/// Send side of the selective-repeat state machine.
///
/// Holds `send_base` (oldest unacknowledged sequence, inclusive), `send_next` (next sequence to
/// assign) and a slot per outstanding packet. `send_next - send_base <= window_size` holds at
/// all times.
#[derive(Debug)]
pub struct SendWindow {
    send_base: SequenceNumber,
    send_next: SequenceNumber,
    window_size: u32,
    timeout: Duration,
    strategy: RetransmitStrategy,
    slots: SequenceBuffer<PacketSlot>,
}

impl SendWindow {
    /// Creates an empty window from the given configuration.
    pub fn new(config: &Config) -> Self {
        SendWindow {
            send_base: INITIAL_SEQUENCE,
            send_next: INITIAL_SEQUENCE,
            window_size: config.window_size,
            timeout: config.retransmit_timeout,
            strategy: config.retransmit_strategy,
            slots: SequenceBuffer::with_capacity(config.send_buffer_capacity),
        }
    }

    /// Returns the oldest unacknowledged sequence number.
    pub fn send_base(&self) -> SequenceNumber {
        self.send_base
    }

    /// Returns the sequence number the next packet will get.
    pub fn send_next(&self) -> SequenceNumber {
        self.send_next
    }

    /// Returns the number of sent packets the window has not slid past yet.
    pub fn packets_in_flight(&self) -> u32 {
        self.send_next.wrapping_sub(self.send_base)
    }

    /// Returns true if no further packet may be sent.
    pub fn is_full(&self) -> bool {
        self.packets_in_flight() >= self.window_size
    }

    /// Returns the number of outstanding packets with an armed retransmission timer.
    pub fn armed_timers(&self) -> usize {
        self.slots.iter().filter(|(_, slot)| slot.is_armed()).count()
    }

    #[cfg(test)]
    pub fn starting_at(config: &Config, sequence: SequenceNumber) -> Self {
        SendWindow {
            send_base: sequence,
            send_next: sequence,
            ..SendWindow::new(config)
        }
    }

    #[cfg(test)]
    pub fn slot(&self, sequence: SequenceNumber) -> Option<&PacketSlot> {
        if self.is_outstanding(sequence) {
            self.slots.get(sequence)
        } else {
            None
        }
    }

    /// Returns the sequence number for the next packet, or `WindowFull` if the window is saturated.
    pub fn next_sequence(&self) -> Result<SequenceNumber> {
        if self.is_full() {
            Err(ErrorKind::WindowFull)
        } else {
            Ok(self.send_next)
        }
    }

    /// Records a data packet that was just put on the wire under `send_next`.
    ///
    /// Stops the timer of whatever previously occupied the slot, arms the retransmission timer
    /// according to the strategy and advances `send_next`.
    pub fn push(
        &mut self,
        packet: Packet,
        address: SockAddr,
        timers: &impl RetransmitScheduler,
    ) -> Result<SequenceNumber> {
        let sequence = self.next_sequence()?;
        debug_assert_eq!(packet.sequence(), sequence);

        let arm = match self.strategy {
            RetransmitStrategy::PerPacket => true,
            RetransmitStrategy::BaseOnly => self.send_base == self.send_next,
        };

        if let Some((_, mut evicted)) = self.slots.insert(sequence, PacketSlot::new(packet, address)) {
            evicted.stop_timer(timers);
        }
        if arm {
            if let Some(slot) = self.slots.get_mut(sequence) {
                slot.start_timer(timers, self.timeout);
            }
        }

        self.send_next = self.send_next.wrapping_add(1);
        Ok(sequence)
    }

    /// Processes an acknowledgment for `sequence`.
    ///
    /// An acknowledgment for the base slides the window: the base advances by one and keeps
    /// advancing over packets that were already acknowledged selectively. Any other outstanding
    /// sequence is only marked as acknowledged.
    pub fn acknowledge(
        &mut self,
        sequence: SequenceNumber,
        timers: &impl RetransmitScheduler,
    ) -> Acknowledgment {
        if !self.is_outstanding(sequence) {
            return Acknowledgment::Ignored;
        }
        match self.slots.get_mut(sequence) {
            Some(slot) if !slot.is_acknowledged() => slot.acknowledge(timers),
            _ => return Acknowledgment::Ignored,
        }

        if sequence != self.send_base {
            return Acknowledgment::Selective;
        }

        while self.send_base != self.send_next {
            match self.slots.get(self.send_base) {
                Some(slot) if slot.is_acknowledged() => {
                    if let Some(mut slot) = self.slots.remove(self.send_base) {
                        slot.stop_timer(timers);
                    }
                    self.send_base = self.send_base.wrapping_add(1);
                }
                _ => break,
            }
        }

        if self.send_base != self.send_next && self.strategy == RetransmitStrategy::BaseOnly {
            if let Some(slot) = self.slots.get_mut(self.send_base) {
                slot.start_timer(timers, self.timeout);
            }
        }

        Acknowledgment::Advanced {
            send_base: self.send_base,
        }
    }

    /// Handles an expired timer.
    ///
    /// Returns the slot to retransmit after re-arming its timer, or `None` if the timer was
    /// disarmed or replaced in the meantime.
    pub fn expire(&mut self, id: TimerId, timers: &impl RetransmitScheduler) -> Option<&PacketSlot> {
        if !self.is_outstanding(id.sequence()) {
            return None;
        }
        let timeout = self.timeout;
        let slot = self.slots.get_mut(id.sequence())?;
        if slot.timer() != Some(id) || slot.is_acknowledged() {
            return None;
        }

        slot.start_timer(timers, timeout);
        slot.record_retransmission();
        Some(slot)
    }

    fn is_outstanding(&self, sequence: SequenceNumber) -> bool {
        !sequence_less_than(sequence, self.send_base) && sequence_less_than(sequence, self.send_next)
    }
}
