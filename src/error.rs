//! Error types reported by the sink and its collaborators.

use thiserror::Error;

/// Failure to resolve a connection descriptor into a [`Config`](crate::Config).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    #[error("malformed URL: {0} is not an absolute URL")]
    NotAbsolute(String),

    #[error("missing database in {0}")]
    MissingDatabase(String),

    #[error("bad parameter {0}")]
    BadParameter(&'static str),

    #[error("cache-events exceeds max-cache-events")]
    CacheEventsExceedMax,

    #[error("queue capacity must be greater than 0")]
    ZeroQueueCapacity,
}

/// Errors surfaced synchronously while constructing a sink.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("couldn't initialize transport for {addr}: {source}")]
    TransportInit {
        addr: String,
        #[source]
        source: TransportError,
    },
}

/// A measurement that cannot be turned into a valid point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointError {
    #[error("measurement name is empty")]
    EmptyMeasurement,

    #[error("point has no fields")]
    NoFields,

    #[error("empty tag key")]
    EmptyTagKey,

    #[error("empty field key")]
    EmptyFieldKey,

    #[error("field {0} is not a finite number")]
    NonFiniteField(String),
}

/// A batch request that can never be accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("database name is empty")]
    EmptyDatabase,

    #[error("invalid database name {0:?}")]
    InvalidDatabase(String),
}

/// Failure talking to the remote store.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// A flush attempt that failed and may be retried on the next trigger.
#[derive(Debug, Error)]
#[error("write of {points} points to {database} failed: {source}")]
pub struct WriteError {
    pub database: String,
    pub points: usize,
    #[source]
    pub source: TransportError,
}
