use std::{
    io,
    mem::MaybeUninit,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use socket2::SockAddr;

use crate::{
    config::Config,
    error::Result,
    net::{DatagramSocket, DatagramSocketReceiver, DatagramSocketSender, LinkConditioner},
};

/// Creates a UDP socket bound to `listen_addr`.
pub fn create_socket(listen_addr: SockAddr, reuse_address: bool) -> io::Result<socket2::Socket> {
    let socket = socket2::Socket::new(
        match listen_addr.is_ipv4() {
            true => socket2::Domain::IPV4,
            false => socket2::Domain::IPV6,
        },
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;
    socket.set_reuse_address(reuse_address)?;
    socket.bind(&listen_addr)?;
    Ok(socket)
}

#[derive(Debug, Clone)]
struct UdpSocketTx {
    socket: Arc<socket2::Socket>,
    link_conditioner: Option<LinkConditioner>,
}

#[derive(Debug)]
struct UdpSocketRx {
    socket: socket2::Socket,
}

/// A UDP socket, optionally wrapped by a `LinkConditioner` that drops or duplicates outgoing packets.
#[derive(Debug)]
pub struct UdpSocket {
    tx: UdpSocketTx,
    rx: UdpSocketRx,
}

impl UdpSocket {
    /// Binds a socket to the first address `addresses` resolves to.
    pub fn bind<A: ToSocketAddrs>(addresses: A, config: &Config) -> Result<Self> {
        let address: SocketAddr = addresses.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address to bind to")
        })?;
        let socket = create_socket(address.into(), config.reuse_address)?;
        Ok(Self::from_socket(socket)?)
    }

    /// Binds to any free port on the loopback interface.
    pub fn bind_any(config: &Config) -> Result<Self> {
        let loopback = Ipv4Addr::new(127, 0, 0, 1);
        Self::bind(SocketAddrV4::new(loopback, 0), config)
    }

    /// Wraps an already bound socket.
    pub fn from_socket(socket: socket2::Socket) -> io::Result<Self> {
        let socket_tx = socket.try_clone()?;
        Ok(UdpSocket {
            tx: UdpSocketTx {
                socket: Arc::new(socket_tx),
                link_conditioner: None,
            },
            rx: UdpSocketRx { socket },
        })
    }

    /// Sets the link conditioner for this socket. See [LinkConditioner] for further details.
    pub fn set_link_conditioner(&mut self, link_conditioner: Option<LinkConditioner>) {
        self.tx.link_conditioner = link_conditioner;
    }
}

impl DatagramSocket for UdpSocket {
    fn split(
        self,
    ) -> (
        Box<dyn DatagramSocketSender + Send + Sync>,
        Box<dyn DatagramSocketReceiver + Send + Sync>,
    ) {
        (Box::new(self.tx), Box::new(self.rx))
    }
}

impl DatagramSocketSender for UdpSocket {
    fn clone_box(&self) -> Box<dyn DatagramSocketSender + Send + Sync> {
        self.tx.clone_box()
    }

    fn send_packet(&self, addr: &SockAddr, payload: &[u8]) -> io::Result<usize> {
        self.tx.send_packet(addr, payload)
    }
}

impl DatagramSocketReceiver for UdpSocket {
    fn receive_packet<'a>(
        &mut self,
        buffer: &'a mut [MaybeUninit<u8>],
    ) -> io::Result<(&'a [u8], SockAddr)> {
        self.rx.receive_packet(buffer)
    }

    fn local_addr(&self) -> io::Result<SockAddr> {
        self.rx.local_addr()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.rx.set_read_timeout(timeout)
    }
}

impl DatagramSocketSender for UdpSocketTx {
    fn clone_box(&self) -> Box<dyn DatagramSocketSender + Send + Sync> {
        Box::new(self.clone())
    }

    // Determinate how many copies of the packet are sent based on the `LinkConditioner`, if any.
    fn send_packet(&self, addr: &SockAddr, payload: &[u8]) -> io::Result<usize> {
        let copies = match &self.link_conditioner {
            Some(link) => link.copies(),
            None => 1,
        };
        for _ in 0..copies {
            self.socket.send_to(payload, addr)?;
        }
        // a dropped packet looks sent to the caller
        Ok(payload.len())
    }
}

impl DatagramSocketReceiver for UdpSocketRx {
    /// Receives a single packet from UDP socket.
    fn receive_packet<'a>(
        &mut self,
        buffer: &'a mut [MaybeUninit<u8>],
    ) -> io::Result<(&'a [u8], SockAddr)> {
        self.socket
            .recv_from(buffer)
            .map(move |(recv_len, address)| {
                // SAFETY: `recv_from` initialized the first `recv_len` bytes.
                let buffer =
                    unsafe { &*(&buffer[..recv_len] as *const [MaybeUninit<u8>] as *const [u8]) };
                (buffer, address)
            })
    }

    /// Returns the socket address that this socket was created from.
    fn local_addr(&self) -> io::Result<SockAddr> {
        self.socket.local_addr()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }
}
