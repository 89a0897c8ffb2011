//! Daily bar stream collection.
//!
//! `GET /stream/barchart/...` answers with a stream of JSON bar objects,
//! one per line, terminated by an `END` sentinel line. The collection loop
//! is an ordinary awaitable future: the caller bounds it with
//! [`BarStreamOptions`], or cancels it outright by dropping the future.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BrokerError;

/// One daily bar from the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DailyBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub down_ticks: u64,
    pub down_volume: u64,
    pub open_interest: u64,
    pub time_stamp: String,
    pub total_ticks: u64,
    pub total_volume: u64,
    pub unchanged_ticks: u64,
    pub unchanged_volume: u64,
    pub up_ticks: u64,
    pub up_volume: u64,
}

/// Bounds on how long and how far a bar collection runs. With no bounds
/// set the stream is read to its end.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarStreamOptions {
    /// Stop collecting after this much wall-clock time.
    pub max_duration: Option<Duration>,
    /// Stop collecting after this many bars.
    pub max_bars: Option<usize>,
}

impl BarStreamOptions {
    pub fn for_duration(max_duration: Duration) -> Self {
        Self {
            max_duration: Some(max_duration),
            max_bars: None,
        }
    }
}

/// Read the response body line by line, decoding each bar strictly, until
/// the stream ends, the `END` sentinel arrives, or an option bound trips.
pub(crate) async fn collect(
    response: reqwest::Response,
    options: BarStreamOptions,
) -> Result<Vec<DailyBar>, BrokerError> {
    let deadline = options
        .max_duration
        .map(|d| tokio::time::Instant::now() + d);
    let mut stream = response.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();
    let mut bars = Vec::new();
    let mut stream_exhausted = false;

    'read: loop {
        let chunk = match deadline {
            Some(at) => match tokio::time::timeout_at(at, stream.next()).await {
                Ok(chunk) => chunk,
                Err(_) => {
                    tracing::debug!(bars = bars.len(), "bar stream deadline reached");
                    break 'read;
                }
            },
            None => stream.next().await,
        };

        let Some(chunk) = chunk else {
            stream_exhausted = true;
            break 'read;
        };
        let chunk = chunk.map_err(BrokerError::Transport)?;
        buf.extend_from_slice(&chunk);

        while let Some(line) = take_line(&mut buf) {
            match push_bar(&line, &mut bars)? {
                LineOutcome::Bar => {
                    if options.max_bars.is_some_and(|max| bars.len() >= max) {
                        tracing::debug!(bars = bars.len(), "bar stream max bars reached");
                        break 'read;
                    }
                }
                LineOutcome::Skip => {}
                LineOutcome::End => break 'read,
            }
        }
    }

    // A final bar may arrive without a trailing newline, but only a stream
    // that ran to completion leaves a meaningful tail; a tripped bound
    // leaves an arbitrary partial buffer behind.
    if stream_exhausted {
        let tail = String::from_utf8_lossy(&buf).into_owned();
        push_bar(&tail, &mut bars)?;
    }

    Ok(bars)
}

#[derive(Debug)]
enum LineOutcome {
    Bar,
    Skip,
    End,
}

fn push_bar(line: &str, bars: &mut Vec<DailyBar>) -> Result<LineOutcome, BrokerError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineOutcome::Skip);
    }
    if line == "END" {
        return Ok(LineOutcome::End);
    }
    let bar = serde_json::from_str(line).map_err(|e| {
        tracing::debug!(raw = line, "unparseable bar line");
        BrokerError::Decode(e)
    })?;
    bars.push(bar);
    Ok(LineOutcome::Bar)
}

/// Drain one `\n`-terminated line off the front of the buffer.
fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buf.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).into_owned())
}
