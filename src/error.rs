use thiserror::Error;

/// Reasons a timer could not be armed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Tokio cannot drive a zero-length interval
    #[error("timer duration must be greater than zero")]
    ZeroDuration,

    /// Timers are spawned onto the runtime of the calling thread
    #[error("no Tokio runtime is available on the calling thread")]
    NoRuntime,

    #[error("timer registry '{0}' has been shut down")]
    Shutdown(String),
}
