use std::{
    net::SocketAddr,
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use log::{error, info};

use rdt::{
    Config, ErrorKind, LinkConditioner, RetransmitStrategy, SelectiveRepeat, ThroughputMonitoring,
    UdpSocket,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pushes payloads through a selective-repeat transport", long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Maximum number of unacknowledged packets
    #[arg(long, default_value_t = 16)]
    window: u32,

    /// Retransmission timeout in milliseconds
    #[arg(long, default_value_t = 200)]
    timeout: u64,

    /// Give every outstanding packet its own retransmission timer
    #[arg(long)]
    per_packet: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Receives payloads and prints them
    Server {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:12345")]
        listen: SocketAddr,
    },
    /// Sends numbered payloads to a server
    Client {
        /// Address of the server
        #[arg(short, long, default_value = "127.0.0.1:12345")]
        server: SocketAddr,

        /// Number of payloads to send
        #[arg(short, long, default_value_t = 1000)]
        count: u32,

        /// Chance that an outgoing packet is dropped, between 0 and 1
        #[arg(long, default_value_t = 0.0)]
        loss: f64,

        /// Chance that an outgoing packet is duplicated, between 0 and 1
        #[arg(long, default_value_t = 0.0)]
        duplication: f64,
    },
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let capacity = args
        .window
        .max(Config::default().send_buffer_capacity)
        .next_power_of_two();
    let config = Config {
        window_size: args.window,
        send_buffer_capacity: capacity,
        receive_buffer_capacity: capacity,
        retransmit_timeout: Duration::from_millis(args.timeout),
        retransmit_strategy: if args.per_packet {
            RetransmitStrategy::PerPacket
        } else {
            RetransmitStrategy::BaseOnly
        },
        ..Default::default()
    };

    let result = match args.mode {
        Mode::Server { listen } => run_server(listen, config),
        Mode::Client {
            server,
            count,
            loss,
            duplication,
        } => run_client(server, count, loss, duplication, config),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run_server(listen: SocketAddr, config: Config) -> rdt::Result<()> {
    let mut transport = SelectiveRepeat::bind_with_config(listen, config)?;
    let mut throughput = ThroughputMonitoring::new(Duration::from_secs(1));
    info!("Listening on {}", listen);

    loop {
        let (payload, source) = transport.receive_from()?;
        println!(
            "{:?}: {}",
            source.as_socket(),
            String::from_utf8_lossy(&payload)
        );
        if throughput.tick() {
            info!("{}", throughput);
        }
    }
}

fn run_client(
    server: SocketAddr,
    count: u32,
    loss: f64,
    duplication: f64,
    config: Config,
) -> rdt::Result<()> {
    let mut socket = UdpSocket::bind_any(&config)?;
    let mut conditioner = LinkConditioner::new();
    conditioner.set_packet_loss(loss);
    conditioner.set_duplication(duplication);
    socket.set_link_conditioner(Some(conditioner));

    let config = Config {
        receive_timeout: Some(Duration::from_millis(100)),
        ..config
    };
    let (tx, mut rx) = SelectiveRepeat::new(socket, config)?.split();
    thread::spawn(move || loop {
        match rx.receive() {
            Ok(_) => {}
            Err(ErrorKind::TransportError(_)) => {}
            Err(e) => error!("{}", e),
        }
    });

    let destination: socket2::SockAddr = server.into();
    let mut throughput = ThroughputMonitoring::new(Duration::from_secs(1));
    let started = Instant::now();

    for i in 0..count {
        let payload = format!("payload {}", i);
        loop {
            match tx.send(payload.as_bytes(), &destination) {
                Ok(_) => break,
                Err(ErrorKind::WindowFull) => thread::sleep(Duration::from_millis(1)),
                Err(e) => return Err(e),
            }
        }
        if throughput.tick() {
            info!("{}", throughput);
        }
    }
    while tx.packets_in_flight() > 0 {
        thread::sleep(Duration::from_millis(10));
    }

    info!(
        "Sent and acknowledged {} payloads in {:?}, {} per second on average",
        count,
        started.elapsed(),
        throughput.average()
    );
    Ok(())
}
