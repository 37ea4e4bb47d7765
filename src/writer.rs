use log::*;
use std::sync::Arc;

use crate::{
    error::WriteError,
    point::Point,
    transport::{
        Batch,
        Transport,
    },
};

/// Writes one batch of buffered points and classifies the outcome.
pub(crate) struct BatchWriter {
    database: String,
    transport: Arc<dyn Transport>,
}

impl BatchWriter {
    pub(crate) fn new(database: String, transport: Arc<dyn Transport>) -> Self {
        Self {
            database,
            transport,
        }
    }

    /// Returns `Ok` when the points no longer need to be kept: they were
    /// written, there were none, or they can never form a valid request.
    pub(crate) async fn write(&self, points: &[Point]) -> Result<(), WriteError> {
        if points.is_empty() {
            return Ok(());
        }

        let batch = match Batch::new(&self.database, points) {
            Ok(batch) => batch,
            Err(e) => {
                error!(
                    "couldn't build batch of {} points, dropping them: database={} err={}",
                    points.len(),
                    self.database,
                    e
                );

                return Ok(());
            }
        };

        trace!("writing {} points to {}", batch.len(), self.database);

        self.transport.write(&batch).await.map_err(|e| {
            error!(
                "influxdb client write points failed: database={} points={} err={}",
                self.database,
                points.len(),
                e
            );

            WriteError {
                database: self.database.clone(),
                points: points.len(),
                source: e,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        point::{
            Fields,
            Tags,
        },
        testing::RecordingTransport,
    };
    use std::time::UNIX_EPOCH;

    fn points(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let mut fields = Fields::new();
                fields.insert("value".to_string(), (i as i64).into());
                Point::new("m", Tags::new(), fields, UNIX_EPOCH).unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_is_noop() {
        let transport = RecordingTransport::failing();
        let writer = BatchWriter::new("db".to_string(), Arc::new(transport.clone()));

        assert!(writer.write(&[]).await.is_ok());
        assert_eq!(0, transport.attempts());
    }

    #[tokio::test]
    async fn write_success() {
        let transport = RecordingTransport::default();
        let writer = BatchWriter::new("db".to_string(), Arc::new(transport.clone()));

        assert!(writer.write(&points(2)).await.is_ok());
        assert_eq!(vec!["m value=0i 0\nm value=1i 0".to_string()], transport.written());
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        pretty_env_logger::try_init().ok();

        let transport = RecordingTransport::failing();
        let writer = BatchWriter::new("db".to_string(), Arc::new(transport.clone()));

        let err = writer.write(&points(3)).await.unwrap_err();
        assert_eq!("db", err.database);
        assert_eq!(3, err.points);
        assert_eq!(1, transport.attempts());
    }

    #[tokio::test]
    async fn malformed_batch_is_dropped() {
        pretty_env_logger::try_init().ok();

        let transport = RecordingTransport::default();
        let writer = BatchWriter::new("bad\0db".to_string(), Arc::new(transport.clone()));

        assert!(writer.write(&points(1)).await.is_ok());
        assert_eq!(0, transport.attempts());
    }
}
