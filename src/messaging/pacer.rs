//! Splits replies into protocol-sized segments and sends them with a fixed
//! pause in between, so the server's flood control does not drop them.

use crate::error::Result;
use crate::llm::QueryOutcome;
use crate::messaging::traits::Session;
use crate::normalize_line;

use std::time::Duration;

pub const DEFAULT_SEGMENT_LENGTH: usize = 250;
pub const DEFAULT_SEGMENT_DELAY: Duration = Duration::from_secs(3);

/// Segment sizing and pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerSettings {
    /// Maximum characters per segment.
    pub max_segment_len: usize,
    /// Pause between two consecutive segments.
    pub inter_segment_delay: Duration,
}

impl Default for PacerSettings {
    fn default() -> Self {
        Self {
            max_segment_len: DEFAULT_SEGMENT_LENGTH,
            inter_segment_delay: DEFAULT_SEGMENT_DELAY,
        }
    }
}

/// One line to send, and how long to wait after the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSegment {
    pub text: String,
    pub delay_before: Duration,
}

/// Plan the sends for a query outcome. Failures produce nothing.
pub fn plan(outcome: &QueryOutcome, settings: &PacerSettings) -> Vec<OutboundSegment> {
    let Ok(text) = outcome else {
        return Vec::new();
    };

    split_segments(&normalize_line(text), settings.max_segment_len)
        .into_iter()
        .enumerate()
        .map(|(index, text)| OutboundSegment {
            text,
            delay_before: if index == 0 {
                Duration::ZERO
            } else {
                settings.inter_segment_delay
            },
        })
        .collect()
}

/// Cut `text` into consecutive pieces of exactly `max_len` characters, the
/// last one possibly shorter. No word-boundary handling.
pub fn split_segments(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut segments = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .nth(max_len)
            .map(|(byte_index, _)| byte_index)
            .unwrap_or(remaining.len());
        let (segment, rest) = remaining.split_at(split_at);
        segments.push(segment.to_string());
        remaining = rest;
    }

    segments
}

/// Send the planned segments in order, sleeping before each as planned.
/// Stops at the first failed send. Returns how many segments went out.
pub async fn deliver<S: Session>(
    session: &S,
    target: &str,
    segments: Vec<OutboundSegment>,
) -> Result<usize> {
    let mut sent = 0;
    for segment in segments {
        if !segment.delay_before.is_zero() {
            tokio::time::sleep(segment.delay_before).await;
        }
        session.send(target, &segment.text).await?;
        sent += 1;
    }
    Ok(sent)
}
