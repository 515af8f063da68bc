//! Tracks request lifecycles from the `Network` event stream into the shared
//! network buffer.
//!
//! The buffer slot for a request is fixed at request-sent time; the response
//! and completion events mutate it in place. Updates to entries the ring has
//! already evicted are dropped silently.

use std::sync::Arc;

use base64::Engine;
use fnv::FnvHashMap;
use tracing::trace;

use crate::capture::{EventBuffers, NetworkEntry};
use crate::cdp::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    GetResponseBodyReturns, RequestId,
};
use crate::ring::Seq;

/// A completed response whose body should be fetched from the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFetch {
    pub request_id: RequestId,
    pub session_id: Option<String>,
}

#[derive(Debug)]
struct PendingRequestState {
    seq: Seq,
    /// Monotonic seconds at request start, for duration arithmetic.
    sent_monotonic: f64,
    session_id: Option<String>,
    mime_type: String,
    status: i64,
    settled: bool,
}

/// Network lifecycle state machine feeding [`EventBuffers::network`].
#[derive(Debug)]
pub struct NetworkTracker {
    buffers: Arc<EventBuffers>,
    pending: FnvHashMap<RequestId, PendingRequestState>,
    body_cap: usize,
}

impl NetworkTracker {
    pub fn new(buffers: Arc<EventBuffers>, body_cap: usize) -> Self {
        Self {
            buffers,
            pending: FnvHashMap::default(),
            body_cap,
        }
    }

    pub fn on_request_sent(&mut self, session_id: Option<&str>, event: EventRequestWillBeSent) {
        // a redirect hop reuses the request id; refresh the existing slot
        // instead of double-counting the request
        if let Some(state) = self.pending.get_mut(&event.request_id) {
            state.sent_monotonic = event.timestamp;
            state.status = 0;
            state.mime_type.clear();
            let seq = state.seq;
            self.buffers.network.update(seq, |entry| {
                entry.url = event.request.url.clone();
                entry.method = event.request.method.clone();
                entry.request_headers = event.request.headers.to_map();
                entry.status = 0;
            });
            self.buffers.touch_network();
            return;
        }

        let entry = NetworkEntry {
            request_id: event.request_id.as_ref().to_string(),
            url: event.request.url.clone(),
            method: event.request.method.clone(),
            status: 0,
            mime_type: String::new(),
            request_time_ms: event.wall_time * 1000.0,
            duration_s: 0.0,
            size_bytes: 0,
            resource_type: event
                .r#type
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "other".to_string()),
            failed: false,
            error: None,
            request_headers: event.request.headers.to_map(),
            response_headers: Default::default(),
            body: String::new(),
            body_truncated: false,
        };

        let seq = self.buffers.append_network(entry);
        self.pending.insert(
            event.request_id,
            PendingRequestState {
                seq,
                sent_monotonic: event.timestamp,
                session_id: session_id.map(str::to_string),
                mime_type: String::new(),
                status: 0,
                settled: false,
            },
        );
    }

    pub fn on_response(&mut self, event: EventResponseReceived) {
        let Some(state) = self.pending.get_mut(&event.request_id) else {
            return;
        };
        state.mime_type = event.response.mime_type.clone();
        state.status = event.response.status;

        let response = event.response;
        self.buffers.network.update(state.seq, |entry| {
            entry.status = response.status;
            entry.mime_type = response.mime_type.clone();
            entry.response_headers = response.headers.to_map();
            if let Some(length) = response.encoded_data_length {
                entry.size_bytes = length.max(0.0) as u64;
            }
        });
        self.buffers.touch_network();
    }

    /// Finalizes a successful request. Returns a body-fetch instruction when
    /// the response looks worth retrieving.
    pub fn on_finished(&mut self, event: EventLoadingFinished) -> Option<BodyFetch> {
        let state = self.pending.get_mut(&event.request_id)?;
        let duration = (event.timestamp - state.sent_monotonic).max(0.0);
        if !state.settled {
            state.settled = true;
            self.buffers.settle_network();
        }

        let live = self.buffers.network.update(state.seq, |entry| {
            entry.duration_s = duration;
            entry.size_bytes = event.encoded_data_length.max(0.0) as u64;
        });

        let fetch = live
            && self.body_cap > 0
            && state.status > 0
            && is_text_mime(&state.mime_type);
        if fetch {
            Some(BodyFetch {
                request_id: event.request_id.clone(),
                session_id: self.pending[&event.request_id].session_id.clone(),
            })
        } else {
            self.pending.remove(&event.request_id);
            None
        }
    }

    pub fn on_failed(&mut self, event: EventLoadingFailed) {
        let Some(state) = self.pending.remove(&event.request_id) else {
            return;
        };
        if !state.settled {
            self.buffers.settle_network();
        }
        let duration = (event.timestamp - state.sent_monotonic).max(0.0);
        self.buffers.network.update(state.seq, |entry| {
            entry.failed = true;
            entry.error = Some(event.error_text.clone());
            entry.duration_s = duration;
        });
    }

    /// Applies a fetched response body, truncating at the configured cap.
    pub fn on_body(&mut self, request_id: &RequestId, returns: GetResponseBodyReturns) {
        let Some(state) = self.pending.remove(request_id) else {
            return;
        };

        let raw = if returns.base64_encoded {
            match base64::engine::general_purpose::STANDARD.decode(returns.body.as_bytes()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => return,
            }
        } else {
            returns.body
        };

        let (body, truncated) = truncate_utf8(raw, self.body_cap);
        self.buffers.network.update(state.seq, |entry| {
            entry.body = body.clone();
            entry.body_truncated = truncated;
        });
    }

    /// Body retrieval failures are non-fatal; the entry just keeps an empty
    /// body.
    pub fn on_body_error(&mut self, request_id: &RequestId) {
        trace!(request_id = request_id.as_ref(), "response body not retrievable");
        self.pending.remove(request_id);
    }

    /// Settles everything a vanished session still had in flight.
    pub fn session_gone(&mut self, session_id: &str) {
        let mut unsettled = 0;
        self.pending.retain(|_, state| {
            if state.session_id.as_deref() == Some(session_id) {
                if !state.settled {
                    unsettled += 1;
                }
                false
            } else {
                true
            }
        });
        for _ in 0..unsettled {
            self.buffers.settle_network();
        }
    }

    /// Drops all in-flight bookkeeping, settling the counter. Used when the
    /// browser connection is re-established.
    pub fn reset(&mut self) {
        let unsettled = self.pending.values().filter(|s| !s.settled).count();
        for _ in 0..unsettled {
            self.buffers.settle_network();
        }
        self.pending.clear();
    }
}

fn is_text_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    mime.starts_with("text/")
        || mime.contains("json")
        || mime.contains("javascript")
        || mime.contains("xml")
        || mime.contains("svg")
        || mime.contains("x-www-form-urlencoded")
}

/// Truncates to at most `cap` bytes on a char boundary.
fn truncate_utf8(mut s: String, cap: usize) -> (String, bool) {
    if s.len() <= cap {
        return (s, false);
    }
    let mut cut = cap;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    (s, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::network::{Headers, Request, ResourceType, Response};

    fn tracker(cap: usize) -> (NetworkTracker, Arc<EventBuffers>) {
        let buffers = Arc::new(EventBuffers::new(16, 16));
        (NetworkTracker::new(Arc::clone(&buffers), cap), buffers)
    }

    fn sent(id: &str, url: &str, at: f64) -> EventRequestWillBeSent {
        EventRequestWillBeSent {
            request_id: RequestId::from(id.to_string()),
            document_url: url.to_string(),
            request: Request {
                url: url.to_string(),
                method: "GET".to_string(),
                headers: Headers(serde_json::json!({"Accept": "*/*"})),
                post_data: None,
            },
            timestamp: at,
            wall_time: 1_700_000_000.0 + at,
            r#type: Some(ResourceType::Fetch),
        }
    }

    fn response(id: &str, status: i64, mime: &str) -> EventResponseReceived {
        EventResponseReceived {
            request_id: RequestId::from(id.to_string()),
            timestamp: 0.0,
            r#type: ResourceType::Fetch,
            response: Response {
                url: String::new(),
                status,
                status_text: "OK".to_string(),
                headers: Headers(serde_json::json!({"Content-Type": mime})),
                mime_type: mime.to_string(),
                encoded_data_length: Some(10.0),
            },
        }
    }

    #[test]
    fn lifecycle_success_assembles_entry() {
        let (mut tracker, buffers) = tracker(1024);
        tracker.on_request_sent(Some("sess-1"), sent("r1", "https://valid/ok", 100.0));
        tracker.on_response(response("r1", 200, "application/json"));
        let fetch = tracker.on_finished(EventLoadingFinished {
            request_id: RequestId::from("r1".to_string()),
            timestamp: 100.5,
            encoded_data_length: 42.0,
        });
        assert_eq!(
            fetch,
            Some(BodyFetch {
                request_id: RequestId::from("r1".to_string()),
                session_id: Some("sess-1".to_string()),
            })
        );

        let entries = buffers.network.snapshot();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.status, 200);
        assert!(!entry.failed);
        assert_eq!(entry.size_bytes, 42);
        assert!((entry.duration_s - 0.5).abs() < 1e-9);
        assert_eq!(entry.request_headers.get("Accept").unwrap(), "*/*");
        assert_eq!(buffers.inflight_requests(), 0);
    }

    #[test]
    fn lifecycle_failure_keeps_status_zero() {
        let (mut tracker, buffers) = tracker(1024);
        tracker.on_request_sent(None, sent("r2", "https://broken/", 10.0));
        tracker.on_failed(EventLoadingFailed {
            request_id: RequestId::from("r2".to_string()),
            timestamp: 10.25,
            r#type: None,
            error_text: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            canceled: None,
        });

        let entry = &buffers.network.snapshot()[0];
        assert!(entry.failed);
        assert_eq!(entry.status, 0);
        assert_eq!(entry.error.as_deref(), Some("net::ERR_NAME_NOT_RESOLVED"));
        assert!((entry.duration_s - 0.25).abs() < 1e-9);
        assert_eq!(buffers.inflight_requests(), 0);
    }

    #[test]
    fn body_is_truncated_at_cap() {
        let (mut tracker, buffers) = tracker(8);
        tracker.on_request_sent(None, sent("r3", "https://valid/big", 0.0));
        tracker.on_response(response("r3", 200, "text/plain"));
        let fetch = tracker.on_finished(EventLoadingFinished {
            request_id: RequestId::from("r3".to_string()),
            timestamp: 0.1,
            encoded_data_length: 100.0,
        });
        assert!(fetch.is_some());

        tracker.on_body(
            &RequestId::from("r3".to_string()),
            GetResponseBodyReturns {
                body: "0123456789abcdef".to_string(),
                base64_encoded: false,
            },
        );
        let entry = &buffers.network.snapshot()[0];
        assert_eq!(entry.body, "01234567");
        assert!(entry.body_truncated);
    }

    #[test]
    fn binary_mime_skips_body_fetch() {
        let (mut tracker, _buffers) = tracker(1024);
        tracker.on_request_sent(None, sent("r4", "https://valid/img.png", 0.0));
        tracker.on_response(response("r4", 200, "image/png"));
        let fetch = tracker.on_finished(EventLoadingFinished {
            request_id: RequestId::from("r4".to_string()),
            timestamp: 0.1,
            encoded_data_length: 5000.0,
        });
        assert!(fetch.is_none());
    }

    #[test]
    fn updates_for_evicted_entries_are_dropped() {
        let buffers = Arc::new(EventBuffers::new(16, 1));
        let mut tracker = NetworkTracker::new(Arc::clone(&buffers), 1024);
        tracker.on_request_sent(None, sent("old", "https://valid/1", 0.0));
        tracker.on_request_sent(None, sent("new", "https://valid/2", 1.0));

        // "old" got evicted by "new"; its response must not clobber anything
        tracker.on_response(response("old", 500, "text/plain"));
        let entries = buffers.network.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].request_id, "new");
        assert_eq!(entries[0].status, 0);
    }

    #[test]
    fn redirect_hop_does_not_double_count() {
        let (mut tracker, buffers) = tracker(1024);
        tracker.on_request_sent(None, sent("r5", "https://valid/old", 0.0));
        // same request id, new url: a redirect hop
        tracker.on_request_sent(None, sent("r5", "https://valid/new", 0.5));
        assert_eq!(buffers.inflight_requests(), 1);
        assert_eq!(buffers.network.len(), 1);
        assert_eq!(buffers.network.snapshot()[0].url, "https://valid/new");

        tracker.on_finished(EventLoadingFinished {
            request_id: RequestId::from("r5".to_string()),
            timestamp: 1.0,
            encoded_data_length: 1.0,
        });
        assert_eq!(buffers.inflight_requests(), 0);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let (body, truncated) = truncate_utf8("héllo".to_string(), 2);
        assert_eq!(body, "h");
        assert!(truncated);
        let (body, truncated) = truncate_utf8("ok".to_string(), 10);
        assert_eq!(body, "ok");
        assert!(!truncated);
    }
}
