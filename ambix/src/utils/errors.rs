#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Cannot multiply {left_rows}x{left_cols} by {right_rows}x{right_cols}")]
    DimensionMismatch {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("Matrix of {rows}x{cols} needs {expected} values, got {actual}")]
    DataLength {
        rows: usize,
        cols: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Sample buffer too short: need {expected} samples, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Matrix is rank deficient and has no pseudo-inverse")]
    RankDeficient,

    #[error("Operation needs a non-empty matrix")]
    Empty,

    #[error("No Furse-Malham layout with {0} channels")]
    UnsupportedLayout(usize),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Adaptor chunk truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Adaptor chunk has invalid dimensions {rows}x{cols}")]
    InvalidDimensions { rows: i32, cols: i32 },

    #[error("Matrix dimension {0} does not fit in an adaptor chunk")]
    DimensionTooLarge(usize),

    #[error("Unrecognized chunk identifier {0:02x?}")]
    UnknownUuid([u8; 16]),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("Adaptor matrix cannot change once the header is written")]
    MatrixAfterStreaming,

    #[error("Premultiply matrix cannot change once reading has started")]
    PremultiplyAfterRead,

    #[error("Extended files need an adaptor matrix before the header is written")]
    MissingAdaptorMatrix,

    #[error("Basic files carry no adaptor matrix")]
    AdaptorNotAllowed,

    #[error("Handle already closed")]
    Closed,
}

#[derive(thiserror::Error, Debug)]
pub enum AmbixError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{0} channels do not form a full ambisonics set")]
    InvalidChannelCount(u32),

    #[error("Basic files cannot carry {0} extra channels")]
    ExtraChannelsInBasic(u32),

    #[error("Cannot determine the ambix format of this file")]
    FormatUndetermined,

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Invalid sample rate {0}")]
    InvalidSampleRate(f64),

    #[error("Adaptor matrix of {rows}x{cols} does not fit {ambi_channels} stored channels")]
    AdaptorMismatch {
        rows: usize,
        cols: usize,
        ambi_channels: u32,
    },

    #[error("Premultiply matrix has {actual} columns, expected {expected}")]
    PremultiplyMismatch { expected: usize, actual: usize },

    #[error("Channel buffer holds {actual} samples, {expected} needed")]
    ChannelBuffer { expected: usize, actual: usize },

    #[error("Duplicate adaptor chunk ignored")]
    DuplicateAdaptor,
}

pub type Result<T> = std::result::Result<T, AmbixError>;
