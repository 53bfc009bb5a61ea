use thiserror::Error;

/// All errors produced by the tidestream transfer engine.
#[derive(Debug, Error)]
pub enum TideError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("source file {0:?} not found")]
    InputUnavailable(std::path::PathBuf),

    #[error("could not commit received data to {path:?}: {source}")]
    OutputUnwritable {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("peer went silent: no progress for {elapsed_secs}s")]
    PeerSilence { elapsed_secs: u64 },

    #[error("receiver stalled: {0} consecutive idle intervals with no data")]
    ReceiverStalled(u32),

    #[error("no request received after {0} attempts")]
    RequestNotAcknowledged(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TideError>;
