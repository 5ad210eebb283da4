use {
    thiserror::Error,
    visits_core::{HttpResponseError, CorsError},
    crate::store::StorageError,
};

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("visits counter {name:?} cannot be incremented past u64::MAX")]
    CounterOverflow { name: String },

    #[error("failed to build response: {0}")]
    Response(#[from] HttpResponseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0:?}")]
    FailedToRead(std::io::Error),

    #[error("failed to parse config: {0}")]
    FailedToParse(serde_yml::Error),

    #[error("invalid cors configuration: {0}")]
    Cors(#[from] CorsError),

    #[error("failed to open store: {reason}")]
    Store { reason: String },
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("failed to create logger: {reason:?}")]
    FailedToCreate { reason: String },
}
