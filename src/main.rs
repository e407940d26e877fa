//! Entry point for `drtp`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup: logging, argument parsing, and opening the file to
//! send or the file to write.

use std::fs::File;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use drtp::client;
use drtp::server;
use drtp::session::SessionConfig;
use drtp::socket::DrtpSocket;

/// Reliable file transfer over UDP (DRTP).
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Receive timeout in milliseconds for every protocol wait.
    #[arg(long, default_value_t = 400)]
    timeout_ms: u64,

    /// Retransmission attempts before a phase gives up.
    #[arg(long, default_value_t = 5)]
    retries: u32,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive one file, then exit.
    Server {
        /// IP address to bind.
        #[arg(short, long)]
        ip: IpAddr,
        /// UDP port to listen on.
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1024..))]
        port: u16,
        /// Advertised receive window (packets).
        #[arg(short, long, default_value_t = 15)]
        window: u16,
        /// Drop the segment with this sequence number once (loss test hook).
        #[arg(short, long)]
        discard: Option<u16>,
        /// Where to write the received bytes.
        #[arg(short, long, default_value = "output.bin")]
        out: PathBuf,
    },
    /// Send one file, then exit.
    Client {
        /// Server IP address.
        #[arg(short, long)]
        ip: IpAddr,
        /// Server UDP port.
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1024..))]
        port: u16,
        /// File to transmit.
        #[arg(short, long)]
        file: PathBuf,
        /// Advertised window (packets).
        #[arg(short, long, default_value_t = 3)]
        window: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = SessionConfig {
        timeout: Duration::from_millis(cli.timeout_ms),
        max_retries: cli.retries,
    };

    match cli.mode {
        Mode::Server {
            ip,
            port,
            window,
            discard,
            out,
        } => {
            let socket = DrtpSocket::bind(SocketAddr::new(ip, port)).await?;
            server::run(&socket, window, discard, config, || File::create(&out)).await?;
        }
        Mode::Client {
            ip,
            port,
            file,
            window,
        } => {
            // Ephemeral port in the same address family as the server.
            let bind: SocketAddr = match ip {
                IpAddr::V4(_) => "0.0.0.0:0".parse()?,
                IpAddr::V6(_) => "[::]:0".parse()?,
            };
            let socket = DrtpSocket::bind(bind).await?;
            let source = File::open(&file)?;
            client::run(&socket, SocketAddr::new(ip, port), source, window, config).await?;
        }
    }

    Ok(())
}
