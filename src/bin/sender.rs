//! Sender binary: reads a file into memory and streams it to a receiver
//! that has already issued (or will issue) the request datagram.

use std::path::PathBuf;
use std::process::ExitCode;

use bytes::Bytes;
use clap::Parser;
use tokio::net::UdpSocket;
use tracing::{error, info};

use tidestream::error::TideError;
use tidestream::session::{self, Profile};

/// Congestion-control strategy selectable from the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ProfileArg {
    Fixed,
    Reno,
    Cubic,
    Bbr,
}

/// Stream a file to a waiting receiver over reliable UDP.
#[derive(Debug, Parser)]
#[command(name = "tidestream-sender", version, about)]
struct Args {
    /// Local address to bind to.
    host: String,
    /// Local port to bind to.
    port: u16,
    /// Sender window size in bytes; only consulted when `--profile fixed`.
    sws: Option<usize>,
    /// Congestion-control profile.
    #[arg(long, value_enum, default_value_t = ProfileArg::Cubic)]
    profile: ProfileArg,
    /// Path to the file to send.
    #[arg(long, default_value = "input_data")]
    input: PathBuf,
}

impl std::fmt::Display for ProfileArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProfileArg::Fixed => "fixed",
            ProfileArg::Reno => "reno",
            ProfileArg::Cubic => "cubic",
            ProfileArg::Bbr => "bbr",
        };
        f.write_str(s)
    }
}

const DEFAULT_FIXED_SWS: usize = 64 * 1024;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "sender session failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), TideError> {
    let data = Bytes::from(
        std::fs::read(&args.input).map_err(|_| TideError::InputUnavailable(args.input.clone()))?,
    );

    let profile = match args.profile {
        ProfileArg::Fixed => Profile::Fixed(args.sws.unwrap_or(DEFAULT_FIXED_SWS)),
        ProfileArg::Reno => Profile::Reno,
        ProfileArg::Cubic => Profile::Cubic,
        ProfileArg::Bbr => Profile::Bbr,
    };

    let socket = UdpSocket::bind((args.host.as_str(), args.port)).await?;
    info!(addr = %socket.local_addr()?, bytes = data.len(), "sender bound, awaiting request");

    session::run_sender(&socket, data, profile).await
}
