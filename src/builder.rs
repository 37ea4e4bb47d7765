//! Builder for customizing the sink before starting it.

use log::*;
use std::sync::Arc;

use tokio::{
    sync::mpsc::channel,
    time::Duration,
};

use crate::{
    config::{
        Config,
        BATCH_WRITE_SECOND_INTERVAL_PARAM,
    },
    error::{
        ConfigError,
        Error,
    },
    probe::Prober,
    sink::InfluxMetricSink,
    transport::{
        HttpTransport,
        Transport,
    },
    worker::Engine,
    writer::BatchWriter,
    MetricFuture,
    DEFAULT_PING_TIMEOUT,
    DEFAULT_PROBE_INTERVAL,
    DEFAULT_QUEUE_CAPACITY,
    DEFAULT_STATSD_QUEUE_CAPACITY,
};

/// Builder allows you to override the parameters resolved from the connection
/// descriptor, or the transport itself, before creating the sink.
pub struct Builder {
    pub(crate) config: Config,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) queue_cap: usize,
    pub(crate) statsd_queue_cap: usize,
    pub(crate) probe_interval: Duration,
    pub(crate) ping_timeout: Duration,
}

impl Builder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
            queue_cap: DEFAULT_QUEUE_CAPACITY,
            statsd_queue_cap: DEFAULT_STATSD_QUEUE_CAPACITY,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Resolves `descriptor` and starts a builder from it.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, ConfigError> {
        Config::parse(descriptor).map(Self::new)
    }

    /// Sets the interval between timer-driven flushes.
    pub fn batch_write_interval(&mut self, interval: Duration) -> &mut Self {
        self.config.batch_write_interval = interval;
        self
    }

    /// Sets the buffered point count that triggers an immediate flush.
    pub fn cache_events(&mut self, cache_events: usize) -> &mut Self {
        self.config.cache_events = cache_events;
        self
    }

    /// Sets the buffered point count at which a failed flush discards the buffer.
    pub fn max_cache_events(&mut self, max_cache_events: usize) -> &mut Self {
        self.config.max_cache_events = max_cache_events;
        self
    }

    /// Sets the point channel capacity (default: [DEFAULT_QUEUE_CAPACITY](crate::DEFAULT_QUEUE_CAPACITY)).
    pub fn queue_cap(&mut self, queue_cap: usize) -> &mut Self {
        self.queue_cap = queue_cap;
        self
    }

    /// Sets the capacity of the queue used by the [`cadence::MetricSink`] bridge
    /// (default: [DEFAULT_STATSD_QUEUE_CAPACITY](crate::DEFAULT_STATSD_QUEUE_CAPACITY)).
    ///
    /// Metrics emitted while this queue is full fail with `WouldBlock`.
    pub fn statsd_queue_cap(&mut self, statsd_queue_cap: usize) -> &mut Self {
        self.statsd_queue_cap = statsd_queue_cap;
        self
    }

    /// Sets the liveness probe interval (default: [DEFAULT_PROBE_INTERVAL](crate::DEFAULT_PROBE_INTERVAL)).
    pub fn probe_interval(&mut self, interval: Duration) -> &mut Self {
        self.probe_interval = interval;
        self
    }

    /// Sets the liveness probe timeout (default: [DEFAULT_PING_TIMEOUT](crate::DEFAULT_PING_TIMEOUT)).
    pub fn ping_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.ping_timeout = timeout;
        self
    }

    /// Uses `transport` instead of an [`HttpTransport`] built from the configuration.
    pub fn transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = Some(transport);
        self
    }

    /// Creates the sink along with the future that drives flushing and
    /// liveness probing. The caller must poll the future, e.g. by spawning it.
    ///
    /// # Errors
    ///
    /// Returns an error when the parameters are inconsistent or the transport
    /// can't be initialized. Nothing is started in that case.
    pub fn build(self) -> Result<(InfluxMetricSink, MetricFuture), Error> {
        let config = self.config;

        if config.cache_events > config.max_cache_events {
            return Err(ConfigError::CacheEventsExceedMax.into());
        }

        if self.queue_cap == 0 || self.statsd_queue_cap == 0 {
            return Err(ConfigError::ZeroQueueCapacity.into());
        }

        if config.batch_write_interval.is_zero() {
            return Err(ConfigError::BadParameter(BATCH_WRITE_SECOND_INTERVAL_PARAM).into());
        }

        if self.probe_interval.is_zero() {
            return Err(ConfigError::BadParameter("probe-interval").into());
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let transport =
                    HttpTransport::new(&config).map_err(|source| Error::TransportInit {
                        addr: config.address.clone(),
                        source,
                    })?;

                Arc::new(transport)
            }
        };

        let target = format!(
            "{}://{}@{}/{}",
            config.scheme, config.username, config.host, config.database
        );

        let (tx, rx) = channel(self.queue_cap);
        let (statsd_tx, statsd_rx) = channel(self.statsd_queue_cap);

        let writer = BatchWriter::new(config.database.clone(), transport.clone());
        let engine = Engine::new(writer, config.cache_events, config.max_cache_events);
        let prober = Prober::new(transport, self.probe_interval, self.ping_timeout, target.clone());
        let period = config.batch_write_interval;

        let worker_fut = async move {
            tokio::select! {
                _ = engine.run(rx, statsd_rx, period) => {}
                _ = prober.run() => {}
            }
        };

        info!("influxdb instrumentation writing to {}", target);

        Ok((InfluxMetricSink { tx, statsd_tx }, Box::pin(worker_fut)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;

    fn builder(descriptor: &str, transport: &RecordingTransport) -> Builder {
        let mut builder = Builder::from_descriptor(descriptor).unwrap();
        builder.transport(Arc::new(transport.clone()));
        builder
    }

    #[test]
    fn from_bad_descriptor() {
        assert!(Builder::from_descriptor("https://host:8086/").is_err());
        assert!(
            Builder::from_descriptor("https://host:8086/db?cache-events=5&max-cache-events=3")
                .is_err()
        );
    }

    #[tokio::test]
    async fn overrides_are_validated() {
        let transport = RecordingTransport::default();

        let mut b = builder("http://localhost/db", &transport);
        b.cache_events(10).max_cache_events(5);
        assert!(matches!(
            b.build(),
            Err(Error::Config(ConfigError::CacheEventsExceedMax))
        ));

        let mut b = builder("http://localhost/db", &transport);
        b.queue_cap(0);
        assert!(matches!(
            b.build(),
            Err(Error::Config(ConfigError::ZeroQueueCapacity))
        ));

        let mut b = builder("http://localhost/db", &transport);
        b.statsd_queue_cap(0);
        assert!(matches!(
            b.build(),
            Err(Error::Config(ConfigError::ZeroQueueCapacity))
        ));

        let mut b = builder("http://localhost/db", &transport);
        b.batch_write_interval(Duration::ZERO);
        assert!(matches!(b.build(), Err(Error::Config(ConfigError::BadParameter(_)))));
    }

    #[tokio::test]
    async fn build_with_http_transport() {
        let b = Builder::from_descriptor("https://u:p@host:8086/mydb").unwrap();
        assert!(b.build().is_ok());
    }
}
