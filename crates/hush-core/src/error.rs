use thiserror::Error;

#[derive(Debug, Error)]
pub enum HushError {
    #[error("not initialized: run 'hush init'")]
    NotInitialized,

    #[error("invalid app id '{0}': must be non-empty and contain no NUL bytes")]
    InvalidAppId(String),

    #[error("invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("invalid day '{0}': expected mon, tue, wed, thu, fri, sat or sun")]
    InvalidDay(String),

    #[error("invalid list mode '{0}': must be allowlist or denylist")]
    InvalidMode(String),

    #[error("no policy for app: {0}")]
    PolicyNotFound(String),

    /// A suppressed notification could not be persisted; its content is lost.
    #[error("persistence failure for {app_id}: {reason}")]
    PersistenceFailure { app_id: String, reason: String },

    /// Re-delivery failed; the entry stays queued for the next tick.
    #[error("delivery of {id} for {app_id} failed, will retry: {reason}")]
    DeliveryRetry {
        app_id: String,
        id: String,
        reason: String,
    },

    #[error("corrupt {table} record: {reason}")]
    RecordCorrupt { table: &'static str, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("notification sink error: {0}")]
    Sink(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HushError>;
