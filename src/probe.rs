use log::*;
use std::sync::Arc;

use tokio::time::{
    interval,
    Duration,
    MissedTickBehavior,
};

use crate::{
    transport::Transport,
    worker::MAX_TIMER_PERIOD,
};

/// Periodically pings the store so unreachability shows up in the logs.
///
/// Shares nothing with the flush engine except the transport.
pub(crate) struct Prober {
    transport: Arc<dyn Transport>,
    period: Duration,
    timeout: Duration,
    target: String,
}

impl Prober {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        period: Duration,
        timeout: Duration,
        target: String,
    ) -> Self {
        Self {
            transport,
            period,
            timeout,
            target,
        }
    }

    pub(crate) async fn probe(&self) -> bool {
        match self.transport.ping(self.timeout).await {
            Ok((rtt, version)) => {
                debug!(
                    "pinged influxdb {}: rtt={:?} version={}",
                    self.target, rtt, version
                );

                true
            }

            Err(e) => {
                warn!("couldn't ping influxdb {}: err={}", self.target, e);
                false
            }
        }
    }

    /// Pings immediately, then once per period. Never returns.
    pub(crate) async fn run(self) {
        let mut ticker = interval(self.period.min(MAX_TIMER_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.probe().await;
        }
    }
}
