use {
    tracing::Level,
    tracing_subscriber::FmtSubscriber,
    crate::error::LoggerError,
};

/// Installs the process-wide subscriber. Called once from `main`; a second call fails.
pub fn init_logging(level: Level, ansi: bool) -> Result<(), LoggerError> {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(ansi)
        .with_target(false)
        .try_init()
        .map_err(|err| LoggerError::FailedToCreate { reason: format!("{err:?}") })
}
