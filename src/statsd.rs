//! Bridge that lets a [`cadence::StatsdClient`] record into the sink.
//!
//! Each statsd line (`name:value[:value...]|type[|@rate][|#tag:v,...]`) becomes
//! one point per value, tagged with its metric type. Enqueueing never waits;
//! the bridge has its own queue (see [`Builder::statsd_queue_cap`](crate::Builder::statsd_queue_cap))
//! so bursts from a client don't depend on the engine being scheduled, and
//! only a full queue surfaces as [`ErrorKind::WouldBlock`] through the
//! client's error handler.

use cadence::MetricSink;
use std::{
    io::{
        Error,
        ErrorKind,
        Result,
    },
    time::SystemTime,
};

use crate::{
    point::{
        FieldValue,
        Fields,
        Point,
        Tags,
        VALUE_FIELD,
    },
    sink::InfluxMetricSink,
    worker::Cmd,
};

pub const METRIC_TYPE_TAG: &str = "metric_type";
pub const SAMPLE_RATE_FIELD: &str = "sample_rate";

impl MetricSink for InfluxMetricSink {
    fn emit(&self, metric: &str) -> Result<usize> {
        let now = SystemTime::now();
        let mut points = Vec::new();
        for line in metric.lines().filter(|l| !l.is_empty()) {
            points.extend(parse_line(line, now)?);
        }

        for point in points {
            self.try_send_statsd(Cmd::Write(point))?;
        }

        Ok(metric.len())
    }

    fn flush(&self) -> Result<()> {
        self.try_send_statsd(Cmd::Flush)
    }
}

fn invalid(line: &str) -> Error {
    Error::new(
        ErrorKind::InvalidInput,
        format!("malformed statsd metric: {}", line),
    )
}

fn metric_type(code: &str) -> Option<&'static str> {
    let name = match code {
        "c" => "counter",
        "g" => "gauge",
        "ms" => "timer",
        "h" => "histogram",
        "m" => "meter",
        "s" => "set",
        "d" => "distribution",
        _ => return None,
    };

    Some(name)
}

fn parse_value(s: &str) -> Option<FieldValue> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v.into());
    }

    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(FieldValue::from)
}

pub(crate) fn parse_line(line: &str, at: SystemTime) -> Result<Vec<Point>> {
    let mut sections = line.split('|');

    let (name, values) = sections
        .next()
        .and_then(|head| head.split_once(':'))
        .ok_or_else(|| invalid(line))?;

    let kind = sections
        .next()
        .and_then(metric_type)
        .ok_or_else(|| invalid(line))?;

    let mut tags = Tags::new();
    tags.insert(METRIC_TYPE_TAG.to_string(), kind.to_string());

    let mut sample_rate = None;
    for section in sections {
        if let Some(rate) = section.strip_prefix('@') {
            sample_rate = Some(rate.parse::<f64>().map_err(|_| invalid(line))?);
        } else if let Some(list) = section.strip_prefix('#') {
            for tag in list.split(',').filter(|t| !t.is_empty()) {
                let (key, value) = tag.split_once(':').unwrap_or((tag, "true"));
                tags.insert(key.to_string(), value.to_string());
            }
        }
    }

    values
        .split(':')
        .map(|v| {
            let value = parse_value(v).ok_or_else(|| invalid(line))?;

            let mut fields = Fields::new();
            fields.insert(VALUE_FIELD.to_string(), value);
            if let Some(rate) = sample_rate {
                fields.insert(SAMPLE_RATE_FIELD.to_string(), rate.into());
            }

            Point::new(name, tags.clone(), fields, at)
                .map_err(|e| Error::new(ErrorKind::InvalidInput, e))
        })
        .collect()
}
