//! In-memory transport used by the unit tests.

use std::sync::{
    Arc,
    Mutex,
};

use async_trait::async_trait;
use tokio::time::Duration;

use crate::{
    error::TransportError,
    transport::{
        Batch,
        Transport,
    },
};

#[derive(Debug, Default)]
pub struct State {
    /// Bodies of every successful write, in order.
    pub written: Vec<String>,
    /// Number of write calls, successful or not.
    pub attempts: usize,
    /// Number of upcoming writes that fail.
    pub failures: usize,
    pub fail_always: bool,
    pub pings: usize,
    pub fail_ping: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    pub state: Arc<Mutex<State>>,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().fail_always = true;
        transport
    }

    pub fn failing_times(n: usize) -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().failures = n;
        transport
    }

    pub fn set_fail_always(&self, fail: bool) {
        self.state.lock().unwrap().fail_always = fail;
    }

    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn pings(&self) -> usize {
        self.state.lock().unwrap().pings
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn write(&self, batch: &Batch) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;

        if state.fail_always {
            return Err(TransportError::Other("store unavailable".to_string()));
        }

        if state.failures > 0 {
            state.failures -= 1;
            return Err(TransportError::Other("store unavailable".to_string()));
        }

        state.written.push(batch.body().to_string());
        Ok(())
    }

    async fn ping(&self, _timeout: Duration) -> Result<(Duration, String), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.pings += 1;

        if state.fail_ping {
            return Err(TransportError::Other("no route to host".to_string()));
        }

        Ok((Duration::from_millis(1), "1.8.10".to_string()))
    }
}
