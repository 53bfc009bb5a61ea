//! Receiver binary: requests a transfer from a sender and commits the
//! reassembled byte stream to `<output-prefix>.bin`.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::UdpSocket;
use tracing::{error, info};

use tidestream::error::TideError;
use tidestream::session;

/// Request and receive a file over reliable UDP.
#[derive(Debug, Parser)]
#[command(name = "tidestream-receiver", version, about)]
struct Args {
    /// Sender host to request the transfer from.
    host: String,
    /// Sender port to request the transfer from.
    port: u16,
    /// Prefix for the output file; written as `<prefix>.bin`.
    #[arg(default_value = "received_data")]
    output_prefix: String,
}

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
            error!(error = %err, "receiver session failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), TideError> {
    let addr_str = format!("{}:{}", args.host, args.port);
    let sender_addr: SocketAddr = addr_str
        .parse()
        .map_err(|_| TideError::InvalidAddress(addr_str.clone()))?;

    let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
    info!(addr = %socket.local_addr()?, %sender_addr, "receiver bound, issuing request");

    let delivered = session::run_receiver(&socket, sender_addr).await?;

    let output_path = format!("{}.bin", args.output_prefix);
    std::fs::write(&output_path, &delivered).map_err(|source| TideError::OutputUnwritable {
        path: output_path.clone().into(),
        source,
    })?;
    info!(path = %output_path, bytes = delivered.len(), "transfer committed to disk");
    Ok(())
}
