//! Wire transport to the time-series store.
//!
//! The sink only needs two capabilities from the store: writing a batch of
//! points to a database, and pinging it. [`HttpTransport`] provides both over
//! the InfluxDB 1.x HTTP API; anything else can be plugged in through the
//! [`Transport`] trait.

use std::fmt;

use async_trait::async_trait;
use log::*;
use reqwest::Client;
use tokio::time::{
    Duration,
    Instant,
};
use url::Url;

use crate::{
    config::Config,
    error::{
        BatchError,
        TransportError,
    },
    point::Point,
};

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

const VERSION_HEADER: &str = "X-Influxdb-Version";

/// A write request scoped to one database, holding its encoded points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    database: String,
    body: String,
    len: usize,
}

impl Batch {
    /// Encodes `points` into a request for `database`.
    pub fn new(database: &str, points: &[Point]) -> Result<Self, BatchError> {
        if database.is_empty() {
            return Err(BatchError::EmptyDatabase);
        }

        if database.chars().any(|c| c.is_control() || c == '"') {
            return Err(BatchError::InvalidDatabase(database.to_string()));
        }

        let mut body = String::new();
        for point in points {
            if !body.is_empty() {
                body.push('\n');
            }

            // writing to a String can't fail
            let _ = fmt::write(&mut body, format_args!("{}", point));
        }

        Ok(Self {
            database: database.to_string(),
            body,
            len: points.len(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Line protocol payload, one point per line.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Client side of the time-series store.
///
/// Implementations synchronize internally; one instance is shared by the
/// flush engine and the liveness prober.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Writes every point in `batch` to its database.
    async fn write(&self, batch: &Batch) -> Result<(), TransportError>;

    /// Checks the store is reachable, returning round-trip time and server version.
    async fn ping(&self, timeout: Duration) -> Result<(Duration, String), TransportError>;
}

/// [`Transport`] speaking the InfluxDB 1.x HTTP API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    write_url: Url,
    ping_url: Url,
    username: String,
    password: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        Self::with_timeout(config, DEFAULT_WRITE_TIMEOUT)
    }

    pub fn with_timeout(config: &Config, write_timeout: Duration) -> Result<Self, TransportError> {
        let base = Url::parse(&config.address)
            .map_err(|e| TransportError::Other(format!("bad address {}: {}", config.address, e)))?;

        let write_url = base
            .join("write")
            .map_err(|e| TransportError::Other(e.to_string()))?;
        let ping_url = base
            .join("ping")
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let client = Client::builder().timeout(write_timeout).build()?;

        Ok(Self {
            client,
            write_url,
            ping_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            req
        } else {
            req.basic_auth(&self.username, self.password.as_ref())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn write(&self, batch: &Batch) -> Result<(), TransportError> {
        let mut url = self.write_url.clone();
        url.query_pairs_mut().append_pair("db", batch.database());

        let req = self.client.post(url).body(batch.body().to_string());
        let res = self.authorize(req).send().await?;

        let status = res.status();
        if status.is_success() {
            debug!("wrote {} points to {}", batch.len(), batch.database());
            return Ok(());
        }

        let body = res.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn ping(&self, timeout: Duration) -> Result<(Duration, String), TransportError> {
        let start = Instant::now();
        let req = self.client.get(self.ping_url.clone()).timeout(timeout);
        let res = self.authorize(req).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let version = res
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok((start.elapsed(), version))
    }
}
