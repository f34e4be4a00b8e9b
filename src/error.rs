//! Error types for tactus.

use thiserror::Error;

/// Error type for tempo-map construction and engine configuration.
///
/// All variants originate on the control thread. The realtime callback
/// path never constructs errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error at line {line}, column {column}: {reason}")]
    Parse {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("invalid tempo: {0}. Must be positive")]
    InvalidTempo(f32),

    #[error("accent pattern has {found} beats, meter expects {expected}")]
    PatternLength { expected: usize, found: usize },

    #[error("per-beat tempo list has {found} entries, section spans {expected} beats")]
    TempiLength { expected: usize, found: usize },

    #[error("only the final section may repeat forever")]
    InfiniteNotLast,

    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("no section labelled {0:?}")]
    UnknownLabel(String),

    #[error("cannot append to a tempo map that plays forever")]
    JoinAfterInfinite,

    #[error("tempo map has no sections")]
    EmptyMap,

    #[error("invalid section: {0}")]
    InvalidSection(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid device: {0}")]
    InvalidDevice(String),

    #[error("audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[error("failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
