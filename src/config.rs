use std::{default::Default, time::Duration};

use crate::{
    error::{ConfigErrorKind, Result},
    net::constants::{
        DEFAULT_BUFFER_CAPACITY, DEFAULT_MTU, DEFAULT_RETRANSMIT_TIMEOUT, DEFAULT_WINDOW_SIZE,
        HEADER_SIZE,
    },
};

/// Decides which outstanding packets are protected by a retransmission timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetransmitStrategy {
    /// Only the oldest unacknowledged packet has an armed timer.
    ///
    /// Packets that were selectively acknowledged are skipped once they become the base,
    /// unacknowledged ones get their timer when the window slides onto them.
    BaseOnly,
    /// Every outstanding packet has its own timer which is disarmed by its acknowledgment.
    PerPacket,
}

/// Contains the configuration options of a selective-repeat transport.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of slots in the send buffer. Bounds the cycle after which a send slot is reused.
    ///
    /// Must be a power of two and at least `window_size`.
    pub send_buffer_capacity: u32,
    /// Number of slots in the receive buffer. Bounds the cycle after which a receive slot is reused.
    ///
    /// Must be a power of two and at least `window_size`. A retransmitted duplicate is only
    /// recognized while its slot has not been reused, so a peer whose window exceeds this
    /// capacity can get an old payload delivered a second time.
    pub receive_buffer_capacity: u32,
    /// The maximum amount of unacknowledged packets in flight. Sending beyond this fails with
    /// `ErrorKind::WindowFull`.
    pub window_size: u32,
    /// Packets will be resent after this amount of time if no acknowledgment has been received.
    /// Retransmission is repeated at this interval until the packet is acknowledged.
    pub retransmit_timeout: Duration,
    /// Which packets get a retransmission timer.
    pub retransmit_strategy: RetransmitStrategy,
    /// Value that specifies the size of the buffer the UDP data will be read into. Defaults to `1452` bytes.
    ///
    /// Payloads larger than this minus the header can not be sent.
    pub receive_buffer_max_size: usize,
    /// Read timeout applied to the datagram socket. When it elapses `receive` returns a
    /// `TransportError` instead of blocking forever.
    pub receive_timeout: Option<Duration>,
    /// Determines if reuse_address is set on the socket.
    pub reuse_address: bool,
}

impl Config {
    /// Checks the preconditions the transport relies on.
    ///
    /// Both buffers need at least `window_size` slots, otherwise two in-flight sequence numbers
    /// alias the same slot. Their capacity has to divide the `u32` sequence space so that the
    /// mapping onto slots stays continuous when sequence numbers wrap.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ConfigErrorKind::ZeroWindow.into());
        }
        for capacity in [self.send_buffer_capacity, self.receive_buffer_capacity] {
            if !capacity.is_power_of_two() {
                return Err(ConfigErrorKind::CapacityNotPowerOfTwo(capacity).into());
            }
        }
        if self.send_buffer_capacity < self.window_size {
            return Err(ConfigErrorKind::SendCapacityBelowWindow {
                capacity: self.send_buffer_capacity,
                window: self.window_size,
            }
            .into());
        }
        if self.receive_buffer_capacity < self.window_size {
            return Err(ConfigErrorKind::ReceiveCapacityBelowWindow {
                capacity: self.receive_buffer_capacity,
                window: self.window_size,
            }
            .into());
        }
        if self.retransmit_timeout.is_zero() {
            return Err(ConfigErrorKind::ZeroRetransmitTimeout.into());
        }
        if self.receive_buffer_max_size <= HEADER_SIZE {
            return Err(ConfigErrorKind::ReceiveBufferTooSmall(self.receive_buffer_max_size).into());
        }
        Ok(())
    }

    /// Returns the largest payload that fits in one datagram.
    pub fn max_payload_size(&self) -> usize {
        self.receive_buffer_max_size.saturating_sub(HEADER_SIZE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            receive_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            window_size: DEFAULT_WINDOW_SIZE,
            retransmit_timeout: DEFAULT_RETRANSMIT_TIMEOUT,
            retransmit_strategy: RetransmitStrategy::BaseOnly,
            receive_buffer_max_size: DEFAULT_MTU as usize,
            receive_timeout: None,
            reuse_address: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::error::{ConfigErrorKind, ErrorKind};

    use super::Config;

    fn config_error(config: Config) -> ConfigErrorKind {
        match config.validate() {
            Err(ErrorKind::InvalidConfig(kind)) => kind,
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn capacity_equal_to_window_is_valid() {
        let config = Config {
            send_buffer_capacity: 4,
            receive_buffer_capacity: 4,
            window_size: 4,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_buffers_smaller_than_window() {
        assert_eq!(
            config_error(Config {
                send_buffer_capacity: 2,
                window_size: 4,
                ..Default::default()
            }),
            ConfigErrorKind::SendCapacityBelowWindow {
                capacity: 2,
                window: 4
            }
        );
        assert_eq!(
            config_error(Config {
                receive_buffer_capacity: 2,
                window_size: 4,
                ..Default::default()
            }),
            ConfigErrorKind::ReceiveCapacityBelowWindow {
                capacity: 2,
                window: 4
            }
        );
    }

    #[test]
    fn rejects_capacities_that_alias_at_wrap() {
        assert_eq!(
            config_error(Config {
                send_buffer_capacity: 3,
                receive_buffer_capacity: 4,
                window_size: 3,
                ..Default::default()
            }),
            ConfigErrorKind::CapacityNotPowerOfTwo(3)
        );
        assert_eq!(
            config_error(Config {
                receive_buffer_capacity: 48,
                ..Default::default()
            }),
            ConfigErrorKind::CapacityNotPowerOfTwo(48)
        );
    }

    #[test]
    fn rejects_degenerate_values() {
        assert_eq!(
            config_error(Config {
                window_size: 0,
                ..Default::default()
            }),
            ConfigErrorKind::ZeroWindow
        );
        assert_eq!(
            config_error(Config {
                retransmit_timeout: Duration::ZERO,
                ..Default::default()
            }),
            ConfigErrorKind::ZeroRetransmitTimeout
        );
        assert_eq!(
            config_error(Config {
                receive_buffer_max_size: 9,
                ..Default::default()
            }),
            ConfigErrorKind::ReceiveBufferTooSmall(9)
        );
    }

    #[test]
    fn max_payload_leaves_room_for_header() {
        let config = Config {
            receive_buffer_max_size: 100,
            ..Default::default()
        };
        assert_eq!(config.max_payload_size(), 91);
    }
}
