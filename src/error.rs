use thiserror::Error;

/// The single error type returned by every fallible operation in the core.
///
/// Variants map directly onto the taxonomy in the error-handling design:
/// configuration, state-machine, segmentation/LL-HLS, blocking-reload, and
/// recording errors all share one enum so callers match on one type.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Pipeline is not running")]
    NotRunning,

    #[error("Pipeline is already running")]
    AlreadyRunning,

    #[error("Component '{0}' is not configured")]
    ComponentNotConfigured(String),

    #[error("Stream has already ended")]
    StreamAlreadyEnded,

    #[error("The first partial segment of a segment must be independent")]
    FirstPartialMustBeIndependent,

    #[error("Partial duration {actual:.5} exceeds part target {target:.5}")]
    PartialDurationExceedsTarget { actual: f64, target: f64 },

    #[error("No segment is currently in progress")]
    SegmentNotInProgress,

    #[error("Blocking request for msn={media_sequence} part={part_index:?} timed out after {timeout:.1}s")]
    RequestTimeout {
        media_sequence: u64,
        part_index: Option<u32>,
        timeout: f64,
    },

    #[error("Recording already reached its maximum duration")]
    MaxDurationReached,

    #[error("Recording was cancelled")]
    Cancelled,

    #[error("Recording has already been finalized")]
    AlreadyFinalized,
}

pub type Result<T> = std::result::Result<T, CoreError>;
