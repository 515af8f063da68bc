//! The driver event loop.
//!
//! One task owns the websocket [`Connection`] and everything that flows over
//! it: command submissions from [`Driver`](crate::driver::Driver) handles,
//! command responses routed back through a pending table, and the event
//! streams that feed the telemetry buffers and the session registry. Because
//! the loop is the only writer, the buffer and registry invariants need no
//! further coordination.

use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use futures::channel::mpsc::Receiver;
use futures::channel::oneshot::Sender as OneshotSender;
use futures::StreamExt;
use tracing::{debug, trace, warn};

use crate::capture::EventBuffers;
use crate::cdp::network::GetResponseBodyParams;
use crate::cdp::target::{AttachToTargetParams, SetDiscoverTargetsParams, TargetInfo};
use crate::cdp::{CallId, CdpEvent, CdpEventMessage, Command, Message, Response};
use crate::conn::Connection;
use crate::error::CdpError;

pub mod console;
pub mod network;
pub mod session;

use network::NetworkTracker;
use session::{PageSession, SessionRegistry};

/// How often the loop sweeps the pending table for stale calls.
const EVICT_INTERVAL: Duration = Duration::from_secs(10);
/// Connection heartbeat period. A heartbeat that has not been answered by
/// the next tick counts as a missed heartbeat and degrades the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A command on its way to the browser, paired with the channel the response
/// goes back over.
#[derive(Debug)]
pub struct CommandMessage {
    pub method: Cow<'static, str>,
    pub session_id: Option<String>,
    pub params: serde_json::Value,
    pub sender: OneshotSender<Response>,
}

impl CommandMessage {
    pub fn new<C: Command>(cmd: C, sender: OneshotSender<Response>) -> serde_json::Result<Self> {
        Self::with_session(cmd, sender, None)
    }

    pub fn with_session<C: Command>(
        cmd: C,
        sender: OneshotSender<Response>,
        session_id: Option<String>,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            method: cmd.identifier(),
            session_id,
            params: serde_json::to_value(cmd)?,
            sender,
        })
    }
}

/// Messages driver handles send into the loop.
pub enum LoopMessage {
    Command(CommandMessage),
    /// Resolve the sender when the next `Page.loadEventFired` arrives for
    /// the session.
    WaitLoad {
        session_id: String,
        tx: OneshotSender<()>,
    },
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum LoopExit {
    /// Every driver handle is gone; the daemon is shutting down.
    Shutdown,
    /// The connection failed; the supervisor decides what happens next.
    Disconnected(CdpError),
}

/// What a pending call id resolves to.
enum Pending {
    /// An external command; the response is forwarded verbatim.
    Driver(OneshotSender<Response>),
    /// Discovery/attach/enable plumbing; failures are logged only.
    Internal(Cow<'static, str>),
    /// A `Network.getResponseBody` issued by the capture pipeline.
    ResponseBody(crate::cdp::network::RequestId),
    Heartbeat,
}

pub struct EventLoop<'a> {
    conn: Connection,
    from_driver: &'a mut Receiver<LoopMessage>,
    pending: FnvHashMap<CallId, (Pending, Instant)>,
    registry: Arc<Mutex<SessionRegistry>>,
    buffers: Arc<EventBuffers>,
    network: NetworkTracker,
    load_waiters: Vec<(String, OneshotSender<()>)>,
    request_timeout: Duration,
    heartbeat_outstanding: bool,
}

impl<'a> EventLoop<'a> {
    pub fn new(
        conn: Connection,
        from_driver: &'a mut Receiver<LoopMessage>,
        registry: Arc<Mutex<SessionRegistry>>,
        buffers: Arc<EventBuffers>,
        body_cap: usize,
        request_timeout: Duration,
    ) -> Self {
        let network = NetworkTracker::new(Arc::clone(&buffers), body_cap);
        Self {
            conn,
            from_driver,
            pending: FnvHashMap::default(),
            registry,
            buffers,
            network,
            load_waiters: Vec::new(),
            request_timeout,
            heartbeat_outstanding: false,
        }
    }

    /// Runs until the daemon shuts down or the connection dies.
    pub async fn run(mut self) -> LoopExit {
        // (re)start discovery; the browser answers with one targetCreated per
        // existing target, which drives attachment and registry population
        self.submit_internal(None, SetDiscoverTargetsParams::new(true));

        let mut evict = tokio::time::interval(EVICT_INTERVAL);
        evict.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the immediate first tick doubles as the initial connection probe
        let mut first_heartbeat = true;

        let exit = loop {
            tokio::select! {
                msg = self.from_driver.next() => match msg {
                    Some(LoopMessage::Command(cmd)) => {
                        let id = self.conn.submit_command(cmd.method, cmd.session_id, cmd.params);
                        self.pending
                            .insert(id, (Pending::Driver(cmd.sender), Instant::now()));
                    }
                    Some(LoopMessage::WaitLoad { session_id, tx }) => {
                        self.load_waiters.push((session_id, tx));
                    }
                    None => break LoopExit::Shutdown,
                },
                ev = self.conn.next() => match ev {
                    Some(Ok(Message::Reply(resp))) => self.on_response(resp),
                    Some(Ok(Message::Event(event))) => self.on_event(event),
                    Some(Err(err)) => break LoopExit::Disconnected(err),
                    None => break LoopExit::Disconnected(CdpError::ConnectionClosed),
                },
                _ = evict.tick() => self.evict_stale(),
                _ = heartbeat.tick() => {
                    if self.heartbeat_outstanding && !first_heartbeat {
                        break LoopExit::Disconnected(CdpError::NoResponse);
                    }
                    first_heartbeat = false;
                    self.heartbeat_outstanding = true;
                    self.submit(None, crate::cdp::browser::GetVersionParams::default(), Pending::Heartbeat);
                }
            }
        };

        // settle in-flight accounting so quiescence checks stay meaningful
        // across reconnects
        self.network.reset();
        exit
    }

    fn submit<C: Command>(&mut self, session_id: Option<String>, cmd: C, kind: Pending) {
        let method = cmd.identifier();
        match serde_json::to_value(&cmd) {
            Ok(params) => {
                let id = self.conn.submit_command(method, session_id, params);
                self.pending.insert(id, (kind, Instant::now()));
            }
            Err(err) => warn!(%method, "failed to serialize command: {err}"),
        }
    }

    fn submit_internal<C: Command>(&mut self, session_id: Option<String>, cmd: C) {
        let method = cmd.identifier();
        self.submit(session_id, cmd, Pending::Internal(method));
    }

    fn on_response(&mut self, resp: Response) {
        let Some((kind, _)) = self.pending.remove(&resp.id) else {
            trace!(id = %resp.id, "response for unknown call");
            return;
        };
        match kind {
            Pending::Driver(tx) => {
                let _ = tx.send(resp);
            }
            Pending::Internal(method) => {
                if let Some(err) = resp.error {
                    warn!(%method, "browser rejected command: {err}");
                }
            }
            Pending::ResponseBody(request_id) => match resp.result {
                Some(result) => match serde_json::from_value(result) {
                    Ok(returns) => self.network.on_body(&request_id, returns),
                    Err(_) => self.network.on_body_error(&request_id),
                },
                None => self.network.on_body_error(&request_id),
            },
            Pending::Heartbeat => {
                self.heartbeat_outstanding = false;
            }
        }
    }

    fn on_event(&mut self, event: CdpEventMessage) {
        let session_id = event.session_id.clone();
        match event.params {
            CdpEvent::TargetCreated(ev) => self.on_target_created(ev.target_info),
            CdpEvent::TargetInfoChanged(ev) => {
                let info = ev.target_info;
                self.registry
                    .lock()
                    .unwrap()
                    .update_info(&info.target_id, info.url, info.title);
            }
            CdpEvent::TargetDestroyed(ev) => {
                let removed = self.registry.lock().unwrap().remove_by_target(&ev.target_id);
                if let Some(session) = removed {
                    self.session_gone(&session);
                }
            }
            CdpEvent::AttachedToTarget(ev) => {
                if ev.target_info.is_page() {
                    self.on_attached(ev.session_id.into(), ev.target_info);
                }
            }
            CdpEvent::DetachedFromTarget(ev) => {
                let removed = self
                    .registry
                    .lock()
                    .unwrap()
                    .remove_by_session(&ev.session_id);
                if let Some(session) = removed {
                    self.session_gone(&session);
                }
            }
            CdpEvent::LoadEventFired(_) => {
                if let Some(sid) = session_id.as_deref() {
                    self.complete_load_waiters(sid);
                }
            }
            CdpEvent::ConsoleApiCalled(ev) => {
                self.buffers.console.append(console::from_console_api(ev));
            }
            CdpEvent::ExceptionThrown(ev) => {
                self.buffers.console.append(console::from_exception(ev));
            }
            CdpEvent::RequestWillBeSent(ev) => {
                self.network.on_request_sent(session_id.as_deref(), ev);
            }
            CdpEvent::ResponseReceived(ev) => self.network.on_response(ev),
            CdpEvent::LoadingFinished(ev) => {
                if let Some(fetch) = self.network.on_finished(ev) {
                    self.submit(
                        fetch.session_id,
                        GetResponseBodyParams::new(fetch.request_id.clone()),
                        Pending::ResponseBody(fetch.request_id),
                    );
                }
            }
            CdpEvent::LoadingFailed(ev) => self.network.on_failed(ev),
            CdpEvent::Other(_) => {}
        }
    }

    fn on_target_created(&mut self, info: TargetInfo) {
        if !info.is_page() {
            return;
        }
        if self.registry.lock().unwrap().get(&info.target_id).is_some() {
            return;
        }
        debug!(target_id = info.target_id.as_ref(), url = %info.url, "page target appeared");
        self.submit_internal(None, AttachToTargetParams::new(info.target_id));
    }

    fn on_attached(&mut self, session_id: String, info: TargetInfo) {
        debug!(
            target_id = info.target_id.as_ref(),
            session_id = %session_id,
            "attached to page target"
        );
        self.registry.lock().unwrap().insert(PageSession {
            target_id: info.target_id,
            session_id: session_id.clone().into(),
            url: info.url,
            title: info.title,
        });

        // session-scoped domains the command surface and capture depend on
        let sid = Some(session_id);
        self.submit_internal(sid.clone(), crate::cdp::page::EnableParams::default());
        self.submit_internal(sid.clone(), crate::cdp::runtime::EnableParams::default());
        self.submit_internal(sid.clone(), crate::cdp::network::EnableParams::default());
        self.submit_internal(sid.clone(), crate::cdp::dom::EnableParams::default());
        self.submit_internal(sid, crate::cdp::css::EnableParams::default());
    }

    fn session_gone(&mut self, session: &PageSession) {
        self.network.session_gone(session.session_id.as_ref());
        self.load_waiters
            .retain(|(sid, _)| sid != session.session_id.as_ref());
    }

    fn complete_load_waiters(&mut self, session_id: &str) {
        let mut kept = Vec::with_capacity(self.load_waiters.len());
        for (sid, tx) in self.load_waiters.drain(..) {
            if sid == session_id {
                let _ = tx.send(());
            } else {
                kept.push((sid, tx));
            }
        }
        self.load_waiters = kept;
    }

    /// Drops calls that outlived the request timeout; their senders close
    /// and the callers observe a canceled wait.
    fn evict_stale(&mut self) {
        let timeout = self.request_timeout;
        let before = self.pending.len();
        let mut evicted_bodies = Vec::new();
        self.pending.retain(|_, (kind, issued)| {
            if issued.elapsed() <= timeout {
                return true;
            }
            if let Pending::ResponseBody(request_id) = kind {
                evicted_bodies.push(request_id.clone());
            }
            false
        });
        for request_id in evicted_bodies {
            self.network.on_body_error(&request_id);
        }
        let evicted = before - self.pending.len();
        if evicted > 0 {
            debug!(evicted, "evicted stale pending calls");
        }
    }
}

/// Decodes a raw [`Response`] into the command's typed return value.
pub(crate) fn decode_response<T: Command>(resp: Response) -> Result<T::Response, CdpError> {
    match resp.into_payload() {
        Ok(Some(payload)) => Ok(serde_json::from_value(payload)?),
        Ok(None) => Err(CdpError::NoResponse),
        Err(err) => Err(err.into()),
    }
}
