// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dead-letter records for queue deliveries that could not be processed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::format_utc_rfc3339;

/// Why a delivery was dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// Payload could not be parsed; retrying can never succeed.
    MalformedPayload,
    /// Processing kept failing until the attempt budget ran out.
    RetriesExhausted,
}

impl DeadLetterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadLetterReason::MalformedPayload => "malformed_payload",
            DeadLetterReason::RetriesExhausted => "retries_exhausted",
        }
    }
}

/// Terminal record of an undeliverable event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Document ID, fixed when the letter is built
    pub id: String,
    /// Activity the event referred to, when the payload was readable
    pub activity_id: Option<u64>,
    /// Raw payload as received (lossy UTF-8)
    pub payload: String,
    pub reason: DeadLetterReason,
    /// Last error message seen
    pub error: String,
    /// Delivery attempts made, including the final one
    pub attempts: u32,
    /// ISO 8601
    pub dead_lettered_at: String,
}

impl DeadLetter {
    /// Build the record for one delivery.
    ///
    /// Letters for a known activity are keyed by activity, reason and attempt,
    /// so writing the same letter twice leaves one document. Unreadable payloads
    /// have no activity and are keyed by the time they were dead-lettered.
    pub fn new(
        activity_id: Option<u64>,
        payload: String,
        reason: DeadLetterReason,
        error: String,
        attempts: u32,
        at: DateTime<Utc>,
    ) -> Self {
        let subject = match activity_id {
            Some(id) => id.to_string(),
            None => format!("unparsed-{}", at.timestamp_micros()),
        };

        Self {
            id: format!("{}_{}_{}", subject, reason.as_str(), attempts),
            activity_id,
            payload,
            reason,
            error,
            attempts,
            dead_lettered_at: format_utc_rfc3339(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_id_is_derived_from_the_letter() {
        let letter = DeadLetter::new(
            Some(42),
            "{}".to_string(),
            DeadLetterReason::RetriesExhausted,
            "store unavailable".to_string(),
            5,
            at(),
        );

        assert_eq!(letter.id, "42_retries_exhausted_5");
        assert_eq!(letter.dead_lettered_at, "2024-03-10T12:00:00Z");
    }

    #[test]
    fn test_unparsed_payload_id_uses_dead_letter_time() {
        let letter = DeadLetter::new(
            None,
            "garbage".to_string(),
            DeadLetterReason::MalformedPayload,
            "expected value".to_string(),
            1,
            at(),
        );

        assert_eq!(
            letter.id,
            format!("unparsed-{}_malformed_payload_1", at().timestamp_micros())
        );
    }
}
