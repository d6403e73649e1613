use thiserror::Error;

/// Failures the monitor surfaces to its embedder. Server-reported scan
/// errors are not here: those arrive as events and land in the session
/// state with partial results intact.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("event channel error: {0}")]
    Channel(#[from] redis::RedisError),

    #[error("event channel closed")]
    ChannelClosed,

    #[error("metadata request failed: {0}")]
    Metadata(#[from] reqwest::Error),

    #[error("launch store error: {0}")]
    LaunchStore(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Rejected quiz interactions. These gate the UI; none of them is fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("no question is outstanding")]
    NoQuestion,

    #[error("an answer is already awaiting its result")]
    AwaitingResult,

    #[error("no option selected")]
    NoSelection,

    #[error("option {index} out of range for {count} options")]
    OptionOutOfRange { index: usize, count: usize },
}
