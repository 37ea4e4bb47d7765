//! Asynchronous metric sink that batches points into InfluxDB using the Tokio runtime.
//!
//! Producers record individual points through an [`InfluxMetricSink`]; a single
//! engine task owns the buffer and writes it out as one batch whenever the
//! configured interval elapses or enough points have accumulated. Failed
//! batches stay buffered for the next attempt until `max-cache-events` is
//! reached, at which point they are discarded.
//!
//! The sink is configured from a connection descriptor:
//!
//! `https://<username>:<password>@<host>/<database>?batch-write-second-interval=60&cache-events=3000&max-cache-events=9000`
//!
//! It can also be fed by a [`cadence::StatsdClient`], since it implements
//! [`cadence::MetricSink`].

use std::{
    future::Future,
    pin::Pin,
};

use tokio::time::Duration;

mod builder;
mod config;
mod error;
mod point;
mod probe;
mod sink;
mod statsd;
mod transport;
mod worker;
mod writer;

#[cfg(test)]
mod testing;

pub use builder::Builder;
pub use config::{
    Config,
    BATCH_WRITE_SECOND_INTERVAL_PARAM,
    CACHE_EVENTS_PARAM,
    MAX_CACHE_EVENTS_PARAM,
};
pub use error::{
    BatchError,
    ConfigError,
    Error,
    PointError,
    TransportError,
    WriteError,
};
pub use point::{
    FieldValue,
    Fields,
    Point,
    Tags,
    VALUE_FIELD,
};
pub use sink::{
    InfluxMetricSink,
    ERROR_TAG,
};
pub use statsd::{
    METRIC_TYPE_TAG,
    SAMPLE_RATE_FIELD,
};
pub use transport::{
    Batch,
    HttpTransport,
    Transport,
    DEFAULT_WRITE_TIMEOUT,
};

/// Default interval between timer-driven flushes.
pub const DEFAULT_BATCH_WRITE_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of buffered points that triggers a flush.
pub const DEFAULT_CACHE_EVENTS: usize = 3000;

/// Default number of buffered points discarded after a failed flush.
pub const DEFAULT_MAX_CACHE_EVENTS: usize = 9000;

/// Default capacity of the point channel. Tokio channels can't be unbuffered,
/// so a single slot is as close to a hand-off as it gets.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// Default capacity of the queue behind the non-blocking statsd bridge.
pub const DEFAULT_STATSD_QUEUE_CAPACITY: usize = 1024;

/// Default interval between liveness probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default liveness probe timeout.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Future driving the flush engine and the liveness prober; it completes once
/// every sink handle has been dropped and the last flush was attempted.
pub type MetricFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
