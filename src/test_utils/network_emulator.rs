use std::{
    collections::{hash_map::Entry, HashMap},
    io::{self, Result},
    mem::MaybeUninit,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use socket2::SockAddr;

use crate::net::{DatagramSocket, DatagramSocketReceiver, DatagramSocketSender, LinkConditioner};

type Datagram = (SockAddr, Vec<u8>);

/// This type allows to share global state between all sockets, created from the same instance of `NetworkEmulator`.
type GlobalBindings = Arc<Mutex<HashMap<SockAddr, (Sender<Datagram>, Receiver<Datagram>)>>>;

/// Enables to create the emulated socket, that share global state stored by this network emulator.
#[derive(Debug, Default)]
pub struct NetworkEmulator {
    network: GlobalBindings,
}

impl NetworkEmulator {
    /// Creates an emulated socket by binding to an address.
    /// If other socket already was bound to this address, error will be returned instead.
    pub fn new_socket(&self, address: SockAddr) -> Result<EmulatedSocket> {
        let mut network = self.network.lock().unwrap_or_else(PoisonError::into_inner);
        match network.entry(address.clone()) {
            Entry::Occupied(_) => Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                "Cannot bind to address",
            )),
            Entry::Vacant(entry) => {
                let (_, inbox) = entry.insert(unbounded());
                Ok(EmulatedSocket {
                    network: self.network.clone(),
                    address,
                    inbox: inbox.clone(),
                    conditioner: None,
                    read_timeout: None,
                })
            }
        }
    }

    /// Puts raw bytes on the wire as if `from` had sent them to `to`.
    pub fn inject(&self, from: &SockAddr, to: &SockAddr, datagram: &[u8]) {
        let network = self.network.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((sender, _)) = network.get(to) {
            let _ = sender.send((from.clone(), datagram.to_vec()));
        }
    }

    /// Returns the number of datagrams waiting at `addr`.
    pub fn pending(&self, addr: &SockAddr) -> usize {
        let network = self.network.lock().unwrap_or_else(PoisonError::into_inner);
        network.get(addr).map_or(0, |(_, inbox)| inbox.len())
    }
}

/// Implementation of a socket, that is created by `NetworkEmulator`.
#[derive(Debug, Clone)]
pub struct EmulatedSocket {
    network: GlobalBindings,
    address: SockAddr,
    inbox: Receiver<Datagram>,
    conditioner: Option<LinkConditioner>,
    read_timeout: Option<Duration>,
}

impl EmulatedSocket {
    /// Sets the link conditioner for this socket.
    pub fn set_link_conditioner(&mut self, conditioner: Option<LinkConditioner>) {
        self.conditioner = conditioner;
    }
}

impl DatagramSocket for EmulatedSocket {
    fn split(
        self,
    ) -> (
        Box<dyn DatagramSocketSender + Send + Sync>,
        Box<dyn DatagramSocketReceiver + Send + Sync>,
    ) {
        (Box::new(self.clone()), Box::new(self))
    }
}

impl DatagramSocketSender for EmulatedSocket {
    fn clone_box(&self) -> Box<dyn DatagramSocketSender + Send + Sync> {
        Box::new(self.clone())
    }

    /// Sends a packet to and address if there is a socket bound to it. Otherwise it will simply be ignored.
    fn send_packet(&self, addr: &SockAddr, payload: &[u8]) -> Result<usize> {
        let copies = match &self.conditioner {
            Some(conditioner) => conditioner.copies(),
            None => 1,
        };
        let network = self.network.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((sender, _)) = network.get(addr) {
            for _ in 0..copies {
                let _ = sender.send((self.address.clone(), payload.to_vec()));
            }
        }
        Ok(payload.len())
    }
}

impl DatagramSocketReceiver for EmulatedSocket {
    /// Receives a packet from this socket, waiting at most for the read timeout.
    fn receive_packet<'a>(
        &mut self,
        buffer: &'a mut [MaybeUninit<u8>],
    ) -> Result<(&'a [u8], SockAddr)> {
        let (addr, payload) = match self.read_timeout {
            Some(timeout) => self.inbox.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => io::Error::from(io::ErrorKind::WouldBlock),
                RecvTimeoutError::Disconnected => io::Error::from(io::ErrorKind::NotConnected),
            })?,
            None => self
                .inbox
                .recv()
                .map_err(|_| io::Error::from(io::ErrorKind::NotConnected))?,
        };

        let len = payload.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(&payload[..len]) {
            slot.write(*byte);
        }
        // SAFETY: the first `len` bytes were written above.
        let slice = unsafe { &*(&buffer[..len] as *const [MaybeUninit<u8>] as *const [u8]) };
        Ok((slice, addr))
    }

    /// Returns the socket address that this socket was created from.
    fn local_addr(&self) -> Result<SockAddr> {
        Ok(self.address.clone())
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }
}
