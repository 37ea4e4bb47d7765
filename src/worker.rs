//! The flush engine: sole owner of the point buffer.
//!
//! Producers reach the buffer only through the command channel. Timer ticks and
//! incoming points are merged into a single `select!`, so flushes never overlap
//! and the buffer is never touched from two places at once.

use log::*;

use tokio::{
    sync::mpsc::Receiver,
    time::{
        interval_at,
        Duration,
        Instant,
        MissedTickBehavior,
    },
};

use crate::{
    point::Point,
    writer::BatchWriter,
};

/// Upper bound for timer periods; anything longer effectively never fires.
pub(crate) const MAX_TIMER_PERIOD: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Clone, Debug)]
pub(crate) enum Cmd {
    Write(Point),
    Flush,
}

pub(crate) struct Engine {
    writer: BatchWriter,
    buf: Vec<Point>,
    cache_events: usize,
    max_cache_events: usize,
    overflows: u64,
}

impl Engine {
    pub(crate) fn new(writer: BatchWriter, cache_events: usize, max_cache_events: usize) -> Self {
        Self {
            writer,
            buf: Vec::new(),
            cache_events,
            max_cache_events,
            overflows: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    pub(crate) fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Buffers a point, flushing right away once the count threshold is reached.
    pub(crate) async fn push(&mut self, point: Point) {
        self.buf.push(point);

        if self.buf.len() >= self.cache_events {
            trace!("cache-events reached: {}", self.buf.len());
            self.flush().await;
        }
    }

    pub(crate) async fn flush(&mut self) {
        if self.writer.write(&self.buf).await.is_ok() {
            self.buf = Vec::new();
            return;
        }

        // points stay buffered for the next trigger, up to max-cache-events
        if self.buf.len() >= self.max_cache_events {
            let lost = self.buf.len();
            self.buf = Vec::new();
            self.overflows += 1;

            error!(
                "influxdb write failed and event number reach max-cache-events, cache events was cleaned up: lost={} overflows={}",
                lost, self.overflows
            );
        }
    }

    async fn handle(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::Write(point) => {
                trace!("write: {}", point);
                self.push(point).await;
            }

            Cmd::Flush => {
                trace!("flush");
                self.flush().await;
            }
        }
    }

    /// Runs until the senders of both queues are dropped, then makes one last
    /// flush attempt.
    ///
    /// `rx` carries points from the waiting producers; `statsd_rx` is the
    /// deeper queue fed by the non-blocking statsd bridge.
    pub(crate) async fn run(
        mut self,
        mut rx: Receiver<Cmd>,
        mut statsd_rx: Receiver<Cmd>,
        period: Duration,
    ) {
        let period = period.min(MAX_TIMER_PERIOD);

        // the first tick is due one full period from now
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut points_open = true;
        let mut statsd_open = true;

        while points_open || statsd_open {
            tokio::select! {
                _ = ticker.tick() => {
                    trace!("tick");
                    self.flush().await;
                }

                cmd = rx.recv(), if points_open => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => points_open = false,
                },

                cmd = statsd_rx.recv(), if statsd_open => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => statsd_open = false,
                },
            }
        }

        debug!("stop");
        self.flush().await;
    }
}
