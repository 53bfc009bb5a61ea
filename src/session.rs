//! Session orchestrator: binds a socket, drives the sender or receiver
//! engine to completion, and performs the EOF/request handshakes.
//!
//! Both sides are expressed as a single cooperative `tokio` task polling a
//! `UdpSocket` with bounded-wait reads rather than spawned worker threads --
//! there is exactly one thing happening at a time on each side.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::congestion::{self, CongestionController};
use crate::error::{Result, TideError};
use crate::receiver::{Outcome, Receiver};
use crate::rtt::RttEstimator;
use crate::sender::{AckEvent, SenderEngine};
use crate::wire::{self, Decoded, MAX_PAYLOAD};

/// Poll interval for the sender's non-blocking ACK read.
const SENDER_POLL: Duration = Duration::from_millis(1);
/// Poll interval for the receiver's non-blocking segment read.
const RECEIVER_POLL: Duration = Duration::from_millis(500);
/// Pause between the five EOF segments of the termination handshake.
const EOF_HANDSHAKE_GAP: Duration = Duration::from_millis(100);
/// Number of EOF segments sent (and ACKs replied) at stream end.
const HANDSHAKE_REPEATS: usize = 5;
/// How long the sender tolerates no cumulative-ACK progress before aborting.
const PEER_SILENCE_BOUND: Duration = Duration::from_secs(30);
/// Consecutive idle receiver polls before declaring the session stalled.
const RECEIVER_STALL_LIMIT: u32 = 20;
/// Receiver request retries before giving up on ever reaching a sender.
const REQUEST_RETRIES: u32 = 5;
/// Wait between receiver request retries.
const REQUEST_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Which pluggable window-control strategy a session runs under.
#[derive(Debug, Clone, Copy)]
pub enum Profile {
    /// Constant window of `sws` bytes.
    Fixed(usize),
    /// TCP-NewReno-style slow-start / congestion-avoidance / fast-recovery.
    Reno,
    /// CUBIC growth curve with TCP-friendliness and fast convergence.
    Cubic,
    /// BBR-style BDP-modeled pacing.
    Bbr,
}

impl Profile {
    fn build(&self) -> Box<dyn CongestionController> {
        match self {
            Profile::Fixed(sws) => Box::new(congestion::Fixed::new(*sws)),
            Profile::Reno => Box::new(congestion::Reno::new()),
            Profile::Cubic => Box::new(congestion::Cubic::new()),
            Profile::Bbr => Box::new(congestion::Bbr::new()),
        }
    }

    fn rtt_estimator(&self) -> RttEstimator {
        match self {
            Profile::Bbr => RttEstimator::bbr(),
            _ => RttEstimator::reno_cubic(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Profile::Fixed(_) => "fixed",
            Profile::Reno => "reno",
            Profile::Cubic => "cubic",
            Profile::Bbr => "bbr",
        }
    }
}

/// Await the single-octet request datagram and return the requester's
/// address. Malformed datagrams are silently dropped.
async fn await_request(socket: &UdpSocket) -> Result<SocketAddr> {
    let mut buf = [0u8; MAX_PAYLOAD];
    loop {
        let (n, peer) = socket.recv_from(&mut buf).await?;
        if wire::is_request(&buf[..n]) {
            info!(%peer, "received transfer request");
            return Ok(peer);
        }
        trace!(%peer, len = n, "dropping non-request datagram before session start");
    }
}

/// Run the sender side of a transfer: wait for the request, then drive the
/// sliding-window engine until every byte is acknowledged, finishing with
/// the five-segment EOF handshake. Returns once the peer has the whole file.
pub async fn run_sender(socket: &UdpSocket, data: Bytes, profile: Profile) -> Result<()> {
    let peer = await_request(socket).await?;
    let total = data.len() as u64;
    info!(%peer, total, profile = profile.name(), "starting sender session");

    let mut engine = SenderEngine::new(data);
    let mut rtt = profile.rtt_estimator();
    let mut controller = profile.build();
    let mut last_progress_at = Instant::now();
    let mut buf = [0u8; MAX_PAYLOAD];

    loop {
        let now = Instant::now();

        for segment in engine.fill(controller.effective_window(), now) {
            socket.send_to(&segment, peer).await?;
        }

        match tokio::time::timeout(SENDER_POLL, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) if from == peer => {
                if let Some(ack) = wire::decode_header(&buf[..n]) {
                    let now = Instant::now();
                    match engine.on_ack(ack as u64, now) {
                        AckEvent::NewAck { acked_bytes, new_base, rtt_sample } => {
                            if let Some(sample) = rtt_sample {
                                rtt.sample(sample);
                            }
                            controller.on_new_ack(acked_bytes, new_base, engine.next_seq(), rtt_sample);
                            last_progress_at = now;
                            debug!(base = new_base, cwnd = controller.effective_window(), "cumulative ack");
                        }
                        AckEvent::DuplicateAck { count, retransmit } => {
                            controller.on_duplicate_ack(count);
                            if let Some(segment) = retransmit {
                                socket.send_to(&segment, peer).await?;
                                controller.on_fast_retransmit(engine.next_seq());
                                warn!(base = engine.base(), "fast retransmit on 3rd duplicate ack");
                            }
                        }
                        AckEvent::Stale => {}
                    }
                }
            }
            Ok(Ok(_)) => {} // datagram from an unexpected peer; ignore
            Ok(Err(e)) => return Err(TideError::Io(e)),
            Err(_) => {} // poll interval elapsed with nothing to read
        }

        if let Some((offset, segment)) = engine.check_timeout(rtt.rto(), now) {
            socket.send_to(&segment, peer).await?;
            controller.on_timeout();
            warn!(offset, rto = ?rtt.rto(), "retransmission timeout");
        }

        if engine.is_complete() {
            break;
        }

        if now.duration_since(last_progress_at) > PEER_SILENCE_BOUND {
            return Err(TideError::PeerSilence { elapsed_secs: PEER_SILENCE_BOUND.as_secs() });
        }
    }

    info!(%peer, total, "transfer complete, starting eof handshake");
    let eof = wire::encode_eof(total as u32);
    for _ in 0..HANDSHAKE_REPEATS {
        socket.send_to(&eof, peer).await?;
        sleep(EOF_HANDSHAKE_GAP).await;
    }
    Ok(())
}

/// Run the receiver side of a transfer: send the request (retrying up to
/// [`REQUEST_RETRIES`] times), then reassemble the incoming byte stream
/// until EOF or an idle stall. Returns the delivered bytes.
pub async fn run_receiver(socket: &UdpSocket, sender_addr: SocketAddr) -> Result<Bytes> {
    let request = wire::encode_request();
    let mut buf = [0u8; MAX_PAYLOAD];
    let mut first: Option<(usize, SocketAddr)> = None;

    for attempt in 1..=REQUEST_RETRIES {
        socket.send_to(&request, sender_addr).await?;
        debug!(attempt, "sent transfer request");
        match tokio::time::timeout(REQUEST_RETRY_INTERVAL, socket.recv_from(&mut buf)).await {
            Ok(Ok(got)) => {
                first = Some(got);
                break;
            }
            _ => continue,
        }
    }
    let (first_len, peer) = first.ok_or(TideError::RequestNotAcknowledged(REQUEST_RETRIES))?;
    info!(%peer, "sender acknowledged transfer request");

    let mut receiver = Receiver::new();
    let mut idle_rounds: u32 = 0;

    // Process whatever arrived alongside the request ack, if anything useful.
    if process_segment(socket, peer, &mut receiver, &buf[..first_len]).await? {
        return Ok(receiver.into_delivered());
    }

    loop {
        match tokio::time::timeout(RECEIVER_POLL, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) if from == peer => {
                idle_rounds = 0;
                if process_segment(socket, peer, &mut receiver, &buf[..n]).await? {
                    return Ok(receiver.into_delivered());
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(TideError::Io(e)),
            Err(_) => {
                idle_rounds += 1;
                let ack = wire::encode_ack(receiver.expected() as u32);
                socket.send_to(&ack, peer).await?;
                trace!(expected = receiver.expected(), idle_rounds, "idle prompt ack");
                if idle_rounds >= RECEIVER_STALL_LIMIT {
                    return Err(TideError::ReceiverStalled(RECEIVER_STALL_LIMIT));
                }
            }
        }
    }
}

/// Feed one decoded datagram to the receiver engine and send its ack(s).
/// Returns `true` once EOF has been committed and the transfer is done.
async fn process_segment(
    socket: &UdpSocket,
    peer: SocketAddr,
    receiver: &mut Receiver,
    datagram: &[u8],
) -> Result<bool> {
    match wire::decode(datagram) {
        Some(Decoded::Data { offset, payload }) => {
            let outcome = receiver.on_data(offset as u64, payload);
            send_outcome(socket, peer, outcome).await?;
            Ok(false)
        }
        Some(Decoded::Eof { offset }) => {
            let outcome = receiver.on_eof(offset as u64);
            send_outcome(socket, peer, outcome).await?;
            Ok(true)
        }
        Some(Decoded::Ack { .. }) | None => Ok(false),
    }
}

async fn send_outcome(socket: &UdpSocket, peer: SocketAddr, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Ack { next_expected } => {
            let ack = wire::encode_ack(next_expected as u32);
            socket.send_to(&ack, peer).await?;
        }
        Outcome::Done { next_expected } => {
            let ack = wire::encode_ack(next_expected as u32);
            for _ in 0..HANDSHAKE_REPEATS {
                socket.send_to(&ack, peer).await?;
            }
            info!(next_expected, "eof committed, transfer complete");
        }
    }
    Ok(())
}
