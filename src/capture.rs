//! Captured browser telemetry: the records clients query and the
//! process-global buffers that hold them.
//!
//! The driver event loop is the only writer; everything else reads through
//! snapshots.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::ring::{RingBuffer, Seq};

/// Severity/class of a captured console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    Log,
    Warn,
    Error,
    Info,
    Debug,
    Exception,
}

impl ConsoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleKind::Log => "log",
            ConsoleKind::Warn => "warn",
            ConsoleKind::Error => "error",
            ConsoleKind::Info => "info",
            ConsoleKind::Debug => "debug",
            ConsoleKind::Exception => "exception",
        }
    }
}

/// One captured console message or uncaught exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    #[serde(rename = "type")]
    pub kind: ConsoleKind,
    pub text: String,
    /// Milliseconds since the UNIX epoch, as reported by the page.
    pub timestamp_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<i64>,
}

/// One request lifecycle as observed on the network event stream.
///
/// Created at request start and mutated in place when the response and the
/// completion (or failure) arrive. `status == 0` means the request never
/// produced a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub status: i64,
    pub mime_type: String,
    /// Milliseconds since the UNIX epoch at request start.
    pub request_time_ms: f64,
    /// Seconds from request start to completion or failure.
    pub duration_s: f64,
    pub size_bytes: u64,
    pub resource_type: String,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_headers: BTreeMap<String, String>,
    pub response_headers: BTreeMap<String, String>,
    /// Response body, possibly truncated to the configured cap. Empty when
    /// the body was not retrievable.
    pub body: String,
    pub body_truncated: bool,
}

/// The process-global telemetry buffers plus the bookkeeping the ready-wait
/// quiescence check needs.
#[derive(Debug)]
pub struct EventBuffers {
    pub console: RingBuffer<ConsoleEntry>,
    pub network: RingBuffer<NetworkEntry>,
    inflight: AtomicUsize,
    last_network_change: Mutex<Instant>,
}

impl EventBuffers {
    pub fn new(console_capacity: usize, network_capacity: usize) -> Self {
        Self {
            console: RingBuffer::new(console_capacity),
            network: RingBuffer::new(network_capacity),
            inflight: AtomicUsize::new(0),
            last_network_change: Mutex::new(Instant::now()),
        }
    }

    pub fn append_network(&self, entry: NetworkEntry) -> Seq {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        self.touch_network();
        self.network.append(entry)
    }

    /// Marks one in-flight request settled (finished, failed, or its session
    /// vanished).
    pub fn settle_network(&self) {
        // saturating: a session teardown may settle entries the counter
        // already saw settle
        let _ = self
            .inflight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.touch_network();
    }

    pub fn touch_network(&self) {
        *self.last_network_change.lock().unwrap() = Instant::now();
    }

    pub fn inflight_requests(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    /// True when no request is in flight and nothing has changed for at
    /// least `window`.
    pub fn network_quiet_for(&self, window: Duration) -> bool {
        self.inflight_requests() == 0
            && self.last_network_change.lock().unwrap().elapsed() >= window
    }

    pub fn clear_console(&self) {
        self.console.clear();
    }

    pub fn clear_network(&self) {
        self.network.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> NetworkEntry {
        NetworkEntry {
            request_id: id.to_string(),
            url: "https://example.com/".to_string(),
            method: "GET".to_string(),
            status: 0,
            mime_type: String::new(),
            request_time_ms: 0.0,
            duration_s: 0.0,
            size_bytes: 0,
            resource_type: "document".to_string(),
            failed: false,
            error: None,
            request_headers: BTreeMap::new(),
            response_headers: BTreeMap::new(),
            body: String::new(),
            body_truncated: false,
        }
    }

    #[test]
    fn inflight_counter_tracks_lifecycle() {
        let buffers = EventBuffers::new(10, 10);
        assert_eq!(buffers.inflight_requests(), 0);
        buffers.append_network(entry("1"));
        buffers.append_network(entry("2"));
        assert_eq!(buffers.inflight_requests(), 2);
        buffers.settle_network();
        assert_eq!(buffers.inflight_requests(), 1);
        buffers.settle_network();
        buffers.settle_network();
        assert_eq!(buffers.inflight_requests(), 0);
    }

    #[test]
    fn quiet_needs_zero_inflight() {
        let buffers = EventBuffers::new(10, 10);
        buffers.append_network(entry("1"));
        assert!(!buffers.network_quiet_for(Duration::ZERO));
        buffers.settle_network();
        assert!(buffers.network_quiet_for(Duration::ZERO));
        assert!(!buffers.network_quiet_for(Duration::from_secs(60)));
    }

    #[test]
    fn clears_are_scoped_per_buffer() {
        let buffers = EventBuffers::new(10, 10);
        buffers.console.append(ConsoleEntry {
            kind: ConsoleKind::Log,
            text: "hi".to_string(),
            timestamp_ms: 1.0,
            source_url: None,
            source_line: None,
        });
        buffers.append_network(entry("1"));
        buffers.clear_network();
        assert_eq!(buffers.console.len(), 1);
        assert!(buffers.network.is_empty());
        buffers.clear_console();
        assert!(buffers.console.is_empty());
    }

    #[test]
    fn console_entry_wire_shape() {
        let entry = ConsoleEntry {
            kind: ConsoleKind::Exception,
            text: "boom".to_string(),
            timestamp_ms: 1700000000123.0,
            source_url: Some("https://example.com/app.js".to_string()),
            source_line: Some(17),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "exception");
        assert_eq!(json["source_line"], 17);
    }
}
