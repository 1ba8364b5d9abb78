use std::{
    io,
    mem::MaybeUninit,
    net::ToSocketAddrs,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, error, warn};
use socket2::SockAddr;

use crate::{
    config::Config,
    error::{PacketErrorKind, Result},
    infrastructure::{
        Acknowledgment, Arrival, ReceiveWindow, RetransmitTimers, SendWindow, TimerId,
    },
    net::{
        DatagramSocket, DatagramSocketReceiver, DatagramSocketSender, DisplayAddress, LogObserver,
        TransportEvent, TransportObserver, UdpSocket,
    },
    packet::{Packet, PacketReader, SequenceNumber},
};

// State shared by both halves of a transport and the retransmission timer thread.
//
// `send` and `receive` are independent lock domains, no code path holds both.
#[derive(Debug)]
struct Shared {
    config: Config,
    send: Mutex<SendWindow>,
    receive: Mutex<ReceiveWindow>,
    socket: Box<dyn DatagramSocketSender + Send + Sync>,
    timers: RetransmitTimers,
    observer: Box<dyn TransportObserver>,
}

impl Shared {
    fn lock_send(&self) -> MutexGuard<'_, SendWindow> {
        self.send.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_receive(&self) -> MutexGuard<'_, ReceiveWindow> {
        self.receive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, payload: &[u8], destination: &SockAddr) -> Result<usize> {
        if payload.is_empty() {
            return Err(PacketErrorKind::EmptyPayload.into());
        }
        let max = self.config.max_payload_size();
        if payload.len() > max {
            return Err(PacketErrorKind::ExceededMaxPacketSize {
                size: payload.len(),
                max,
            }
            .into());
        }

        let mut window = self.lock_send();
        let sequence = window.next_sequence()?;
        let packet = Packet::data(sequence, payload)?;
        self.socket.send_packet(destination, &packet.marshal()?)?;
        window.push(packet, destination.clone(), &self.timers)?;
        drop(window);

        self.observer.on_event(TransportEvent::PacketSent {
            sequence,
            address: destination.clone(),
            length: payload.len(),
        });
        Ok(payload.len())
    }

    // Returns the payload if the datagram carried new data.
    fn handle_datagram(&self, datagram: &[u8], source: &SockAddr) -> Option<Vec<u8>> {
        let mut reader = PacketReader::new(datagram);
        let header = match reader.read_header() {
            Ok(header) => header,
            Err(e) => {
                warn!(
                    "Dropping malformed datagram from {}: {}",
                    DisplayAddress(source),
                    e
                );
                return None;
            }
        };

        let sequence = header.sequence();
        if header.is_ack() {
            self.handle_acknowledgment(sequence);
            return None;
        }

        let length = header.data_length() as usize;
        if length == 0 {
            warn!(
                "Dropping data packet {} without payload from {}",
                sequence,
                DisplayAddress(source)
            );
            return None;
        }

        let mut window = self.lock_receive();
        let reply_to = match window.classify(sequence) {
            Arrival::New => {
                let payload = match reader.read_payload(length) {
                    Ok(payload) => payload,
                    Err(e) => {
                        drop(window);
                        warn!(
                            "Dropping data packet {} from {}: {}",
                            sequence,
                            DisplayAddress(source),
                            e
                        );
                        return None;
                    }
                };
                window.record(header, source.clone());
                drop(window);

                self.send_acknowledgment(sequence, source);
                return Some(payload.into_vec());
            }
            Arrival::Duplicate { reply_to } => reply_to,
        };
        drop(window);

        let discarded = reader.discard(length);
        self.send_acknowledgment(sequence, &reply_to);
        self.observer.on_event(TransportEvent::DuplicateDiscarded {
            sequence,
            address: source.clone(),
            discarded,
        });
        None
    }

    fn handle_acknowledgment(&self, sequence: SequenceNumber) {
        let (outcome, send_base) = {
            let mut window = self.lock_send();
            let outcome = window.acknowledge(sequence, &self.timers);
            (outcome, window.send_base())
        };

        match outcome {
            Acknowledgment::Ignored => {
                debug!("Ignoring acknowledgment for packet {}", sequence);
            }
            Acknowledgment::Advanced { .. } | Acknowledgment::Selective => {
                self.observer.on_event(TransportEvent::AckReceived {
                    sequence,
                    send_base,
                });
            }
        }
    }

    // Failures are only logged, the sender retransmits and gets another acknowledgment.
    fn send_acknowledgment(&self, sequence: SequenceNumber, address: &SockAddr) {
        let sent = Packet::acknowledgment(sequence)
            .marshal()
            .and_then(|bytes| Ok(self.socket.send_packet(address, &bytes)?));

        match sent {
            Ok(_) => self.observer.on_event(TransportEvent::AckSent {
                sequence,
                address: address.clone(),
            }),
            Err(e) => error!(
                "Failed to acknowledge packet {} to {}: {}",
                sequence,
                DisplayAddress(address),
                e
            ),
        }
    }

    fn on_retransmit_timeout(&self, id: TimerId) {
        let mut window = self.lock_send();
        let (address, attempt, sent) = match window.expire(id, &self.timers) {
            Some(slot) => {
                let sent = slot
                    .packet()
                    .marshal()
                    .and_then(|bytes| Ok(self.socket.send_packet(slot.address(), &bytes)?));
                (slot.address().clone(), slot.transmissions(), sent)
            }
            None => return,
        };
        drop(window);

        match sent {
            Ok(_) => self.observer.on_event(TransportEvent::Retransmission {
                sequence: id.sequence(),
                address,
                attempt,
            }),
            Err(e) => error!(
                "Failed to retransmit packet {} to {}: {}",
                id.sequence(),
                DisplayAddress(&address),
                e
            ),
        }
    }
}

/// A reliable transport over an unreliable datagram socket, using selective-repeat ARQ.
///
/// Every payload handed to [`send`](SelectiveRepeat::send) is delivered to the peer exactly once
/// as long as the network eventually lets it and its acknowledgment through. Payloads are handed
/// up by [`receive`](SelectiveRepeat::receive) in arrival order, not in sequence order.
///
/// Acknowledgments are processed while receiving, so a sending transport needs someone calling
/// `receive` for its window to move. Use [`split`](SelectiveRepeat::split) to send and receive
/// from different threads. Unacknowledged packets are retransmitted from a background thread,
/// indefinitely, until their acknowledgment arrives or the transport is dropped.
#[derive(Debug)]
pub struct SelectiveRepeat {
    tx: SelectiveRepeatTx,
    rx: SelectiveRepeatRx,
}

impl SelectiveRepeat {
    /// Binds a UDP socket to `addresses` and runs a transport with the default configuration on it.
    pub fn bind<A: ToSocketAddrs>(addresses: A) -> Result<Self> {
        Self::bind_with_config(addresses, Config::default())
    }

    /// Binds to any local port on the system, if available
    pub fn bind_any() -> Result<Self> {
        Self::bind_any_with_config(Config::default())
    }

    /// Binds to any local port on the system, if available, with a given config
    pub fn bind_any_with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind_any(&config)?;
        Self::new(socket, config)
    }

    /// Binds a UDP socket to `addresses` and runs a transport with the given configuration on it.
    pub fn bind_with_config<A: ToSocketAddrs>(addresses: A, config: Config) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind(addresses, &config)?;
        Self::new(socket, config)
    }

    /// Runs a transport on `socket`, reporting events to a [`LogObserver`].
    pub fn new<S: DatagramSocket>(socket: S, config: Config) -> Result<Self> {
        Self::with_observer(socket, config, LogObserver)
    }

    /// Runs a transport on `socket`, reporting events to `observer`.
    ///
    /// Fails with `InvalidConfig` if `config` does not validate, and with `TransportError` if
    /// the read timeout can not be applied or the timer thread can not be started.
    pub fn with_observer<S, O>(socket: S, config: Config, observer: O) -> Result<Self>
    where
        S: DatagramSocket,
        O: TransportObserver + 'static,
    {
        config.validate()?;

        let (socket_tx, mut socket_rx) = socket.split();
        socket_rx.set_read_timeout(config.receive_timeout)?;
        let buffer = vec![MaybeUninit::uninit(); config.receive_buffer_max_size];

        let (timers, worker) = RetransmitTimers::new();
        let shared = Arc::new(Shared {
            send: Mutex::new(SendWindow::new(&config)),
            receive: Mutex::new(ReceiveWindow::new(&config)),
            socket: socket_tx,
            timers,
            observer: Box::new(observer),
            config,
        });

        let weak = Arc::downgrade(&shared);
        worker.spawn(move |id| {
            if let Some(shared) = weak.upgrade() {
                shared.on_retransmit_timeout(id);
            }
        })?;

        Ok(SelectiveRepeat {
            tx: SelectiveRepeatTx {
                shared: shared.clone(),
            },
            rx: SelectiveRepeatRx {
                shared,
                socket: socket_rx,
                buffer,
            },
        })
    }

    /// Splits the transport into its sending and receiving half.
    pub fn split(self) -> (SelectiveRepeatTx, SelectiveRepeatRx) {
        (self.tx, self.rx)
    }

    /// Sends `payload` to `destination`. See [`SelectiveRepeatTx::send`].
    pub fn send(&self, payload: &[u8], destination: &SockAddr) -> Result<usize> {
        self.tx.send(payload, destination)
    }

    /// Receives the next new payload. See [`SelectiveRepeatRx::receive`].
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        self.rx.receive()
    }

    /// Receives the next new payload and its source. See [`SelectiveRepeatRx::receive_from`].
    pub fn receive_from(&mut self) -> Result<(Vec<u8>, SockAddr)> {
        self.rx.receive_from()
    }

    /// Returns the oldest unacknowledged sequence number.
    pub fn send_base(&self) -> SequenceNumber {
        self.tx.send_base()
    }

    /// Returns the sequence number the next packet will get.
    pub fn send_next(&self) -> SequenceNumber {
        self.tx.send_next()
    }

    /// Returns the number of packets that were sent but not slid past yet.
    pub fn packets_in_flight(&self) -> u32 {
        self.tx.packets_in_flight()
    }

    /// Returns the number of outstanding packets with an armed retransmission timer.
    pub fn armed_timers(&self) -> usize {
        self.tx.armed_timers()
    }

    /// Returns the lowest sequence number still tracked for duplicate suppression.
    pub fn receive_base(&self) -> SequenceNumber {
        self.rx.receive_base()
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SockAddr> {
        self.rx.local_addr()
    }

    /// Returns the configuration the transport runs with.
    pub fn config(&self) -> &Config {
        &self.tx.shared.config
    }
}

/// Sending half of a [`SelectiveRepeat`] transport. Cheap to clone, every clone feeds the same window.
#[derive(Debug, Clone)]
pub struct SelectiveRepeatTx {
    shared: Arc<Shared>,
}

impl SelectiveRepeatTx {
    /// Sends `payload` to `destination` as the next data packet and returns its length.
    ///
    /// Never blocks. Fails with `WindowFull` while `window_size` packets are unacknowledged, the
    /// caller should retry later. A payload that is empty or does not fit a single datagram
    /// fails with `PacketError`. If the socket fails, the error is returned and the window is
    /// left untouched.
    pub fn send(&self, payload: &[u8], destination: &SockAddr) -> Result<usize> {
        self.shared.send(payload, destination)
    }

    /// Returns the oldest unacknowledged sequence number.
    pub fn send_base(&self) -> SequenceNumber {
        self.shared.lock_send().send_base()
    }

    /// Returns the sequence number the next packet will get.
    pub fn send_next(&self) -> SequenceNumber {
        self.shared.lock_send().send_next()
    }

    /// Returns the number of packets that were sent but not slid past yet.
    pub fn packets_in_flight(&self) -> u32 {
        self.shared.lock_send().packets_in_flight()
    }

    /// Returns the number of outstanding packets with an armed retransmission timer.
    pub fn armed_timers(&self) -> usize {
        self.shared.lock_send().armed_timers()
    }
}

/// Receiving half of a [`SelectiveRepeat`] transport.
#[derive(Debug)]
pub struct SelectiveRepeatRx {
    shared: Arc<Shared>,
    socket: Box<dyn DatagramSocketReceiver + Send + Sync>,
    buffer: Vec<MaybeUninit<u8>>,
}

impl SelectiveRepeatRx {
    /// Receives the next new payload. See [`receive_from`](SelectiveRepeatRx::receive_from).
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        self.receive_from().map(|(payload, _)| payload)
    }

    /// Blocks until a new data packet arrives and returns its payload and source.
    ///
    /// Acknowledgments that arrive in the meantime are applied to the send window. Duplicates are
    /// acknowledged again and dropped, malformed datagrams are logged and dropped. Fails with
    /// `TransportError` if the socket fails or its read timeout elapses.
    pub fn receive_from(&mut self) -> Result<(Vec<u8>, SockAddr)> {
        loop {
            let (datagram, source) = match self.socket.receive_packet(&mut self.buffer) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                    // this is triggered whenever a previous send hit a closed port
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(payload) = self.shared.handle_datagram(datagram, &source) {
                return Ok((payload, source));
            }
        }
    }

    /// Returns the lowest sequence number still tracked for duplicate suppression.
    pub fn receive_base(&self) -> SequenceNumber {
        self.shared.lock_receive().receive_base()
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SockAddr> {
        Ok(self.socket.local_addr()?)
    }
}
