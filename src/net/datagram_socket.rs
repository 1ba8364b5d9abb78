use std::{fmt::Debug, io::Result, mem::MaybeUninit, time::Duration};

use socket2::SockAddr;

/// A datagram socket is a type of network socket which provides a connectionless point for sending or receiving data packets.
pub trait DatagramSocket: DatagramSocketSender + DatagramSocketReceiver + Debug {
    /// Splits the socket into a sending and a receiving half.
    fn split(
        self,
    ) -> (
        Box<dyn DatagramSocketSender + Send + Sync>,
        Box<dyn DatagramSocketReceiver + Send + Sync>,
    );
}

/// Sending half of a datagram socket. May be used from several threads at once.
pub trait DatagramSocketSender: Debug {
    /// Clones this sender
    fn clone_box(&self) -> Box<dyn DatagramSocketSender + Send + Sync>;

    /// Sends a single datagram to `addr`.
    fn send_packet(&self, addr: &SockAddr, payload: &[u8]) -> Result<usize>;
}

/// Receiving half of a datagram socket.
pub trait DatagramSocketReceiver: Debug {
    /// Receives a single datagram, blocking until one arrives or the read timeout elapses.
    fn receive_packet<'a>(
        &mut self,
        buffer: &'a mut [MaybeUninit<u8>],
    ) -> Result<(&'a [u8], SockAddr)>;

    /// Returns the socket address that this socket was created from.
    fn local_addr(&self) -> Result<SockAddr>;

    /// Sets how long `receive_packet` blocks before failing with `WouldBlock` or `TimedOut`.
    /// `None` blocks indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;
}
