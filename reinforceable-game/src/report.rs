//! Result payloads and the fire-and-forget submission seam.
use crate::compiler::NodeId;
use crate::constants::{SESSION_SUFFIX_ALPHABET, SESSION_SUFFIX_LEN};
use crate::error::ReportError;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Who is playing, echoed into every payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub code: String,
    #[serde(default)]
    pub student: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl SessionIdentity {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            student: None,
            mode: None,
        }
    }

    #[must_use]
    pub fn with_student(mut self, student: impl Into<String>) -> Self {
        self.student = Some(student.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

/// One scored decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: String,
    pub node_id: NodeId,
    pub delta: i32,
    pub choice: String,
}

/// Body posted to the results webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub code: String,
    pub session_id: String,
    pub scenario_id: String,
    pub points: i32,
    pub max_possible: i32,
    pub percent: u8,
    pub timestamp: String,
    pub events: Vec<DecisionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
}

/// Destination for finished-mission payloads.
pub trait ResultSink {
    /// Hand a payload off for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload could not be handed off. Callers in the
    /// runner log and discard it.
    fn submit(&self, payload: &ResultPayload) -> Result<(), ReportError>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn submit(&self, payload: &ResultPayload) -> Result<(), ReportError> {
        (**self).submit(payload)
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Rc<S> {
    fn submit(&self, payload: &ResultPayload) -> Result<(), ReportError> {
        (**self).submit(payload)
    }
}

/// Discards every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn submit(&self, _payload: &ResultPayload) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Keeps every payload in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    payloads: Rc<RefCell<Vec<ResultPayload>>>,
    fail_with: Option<String>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records attempts but reports every one as a network failure.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            payloads: Rc::default(),
            fail_with: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn payloads(&self) -> Vec<ResultPayload> {
        self.payloads.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.borrow().is_empty()
    }
}

impl ResultSink for MemorySink {
    fn submit(&self, payload: &ResultPayload) -> Result<(), ReportError> {
        self.payloads.borrow_mut().push(payload.clone());
        match &self.fail_with {
            Some(reason) => Err(ReportError::Network(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Submit and forget: failures are logged, never returned.
pub fn submit_quietly<S: ResultSink + ?Sized>(sink: &S, payload: &ResultPayload) {
    match sink.submit(payload) {
        Ok(()) => info!(
            "submitted result {} ({} / {}, {}%)",
            payload.session_id, payload.points, payload.max_possible, payload.percent
        ),
        Err(err) => warn!("result submission {} failed: {err}", payload.session_id),
    }
}

/// `"{unix_millis}-{suffix}"` with a lowercase base-36 suffix.
pub fn new_session_id<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SESSION_SUFFIX_ALPHABET.len());
            char::from(SESSION_SUFFIX_ALPHABET[idx])
        })
        .collect();
    format!("{}-{suffix}", now.timestamp_millis())
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn payload() -> ResultPayload {
        ResultPayload {
            code: "ROOM12".to_string(),
            session_id: "1-abc".to_string(),
            scenario_id: "demo".to_string(),
            points: 10,
            max_possible: 10,
            percent: 100,
            timestamp: "2026-10-17T09:00:00.000Z".to_string(),
            events: vec![DecisionRecord {
                timestamp: "2026-10-17T08:59:00.000Z".to_string(),
                node_id: NodeId(0),
                delta: 10,
                choice: "Praise".to_string(),
            }],
            mode: None,
            student: Some("koda".to_string()),
        }
    }

    #[test]
    fn payload_serializes_expected_fields() {
        let value = serde_json::to_value(payload()).unwrap();
        assert_eq!(value["code"], "ROOM12");
        assert_eq!(value["max_possible"], 10);
        assert_eq!(value["events"][0]["node_id"], 0);
        assert_eq!(value["events"][0]["choice"], "Praise");
        assert_eq!(value["student"], "koda");
        assert!(value.get("mode").is_none());
    }

    #[test]
    fn memory_sink_shares_buffer_across_clones() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.submit(&payload()).unwrap();
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.payloads()[0].code, "ROOM12");
    }

    #[test]
    fn failing_sink_is_swallowed() {
        let sink = MemorySink::failing("offline");
        assert!(sink.submit(&payload()).is_err());
        submit_quietly(&sink, &payload());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn session_ids_have_timestamp_and_suffix() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let id = new_session_id(now, &mut rng);
        let (millis, suffix) = id.split_once('-').unwrap();
        assert_eq!(millis, now.timestamp_millis().to_string());
        assert_eq!(suffix.len(), SESSION_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| SESSION_SUFFIX_ALPHABET.contains(&b)));
        assert_ne!(id, new_session_id(now, &mut rng));
    }

    #[test]
    fn timestamps_use_zulu_millis() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        assert_eq!(iso_timestamp(now), "2026-10-17T09:00:00.000Z");
    }
}
