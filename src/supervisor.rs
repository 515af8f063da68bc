//! Connection lifecycle supervision.
//!
//! One task owns the browser connection end to end: it dials, runs the
//! driver event loop until it exits, classifies the exit, and walks the
//! reconnect state machine
//! `Disconnected → Connecting → Connected ⇄ Degraded → Reconnecting →
//! (Connected | Failed)` with exponential backoff and a hard attempt budget.
//! The current state is published over a watch channel that driver handles
//! consult to fail fast.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::mpsc::Receiver as CommandReceiver;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};

use crate::browser::BrowserHandle;
use crate::capture::EventBuffers;
use crate::config::ReconnectPolicy;
use crate::conn::Connection;
use crate::handler::session::SessionRegistry;
use crate::handler::{EventLoop, LoopExit, LoopMessage};
use crate::ipc::protocol::CmdError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Degraded,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Degraded => "Degraded",
            ConnectionState::Reconnecting => "Reconnecting",
            ConnectionState::Failed => "Failed",
        }
    }
}

/// Answer to a manual `reconnect` request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectReport {
    pub state: ConnectionState,
    pub reconnect_count: usize,
}

pub enum SupervisorControl {
    /// Force a fresh dial, resetting the attempt budget. Accepted in any
    /// state.
    Reconnect { tx: oneshot::Sender<ReconnectReport> },
    Shutdown,
}

/// Cloneable control/observation handle onto the supervisor task.
#[derive(Clone)]
pub struct SupervisorHandle {
    control: mpsc::Sender<SupervisorControl>,
    state: watch::Receiver<ConnectionState>,
    reconnects: Arc<AtomicUsize>,
}

impl SupervisorHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Requests a reconnect and waits for the outcome.
    pub async fn reconnect(&self) -> Result<ReconnectReport, CmdError> {
        let (tx, rx) = oneshot::channel();
        self.control
            .send(SupervisorControl::Reconnect { tx })
            .await
            .map_err(|_| CmdError::DriverUnavailable)?;
        rx.await.map_err(|_| CmdError::DriverUnavailable)
    }

    /// Asks the supervisor to tear the connection down and stop. Idempotent;
    /// an already-stopped supervisor is fine.
    pub async fn shutdown(&self) {
        let _ = self.control.send(SupervisorControl::Shutdown).await;
    }
}

enum ConnectOutcome {
    Connected(Connection),
    BudgetExhausted,
    Shutdown,
}

enum RunVerdict {
    Shutdown,
    Disconnected(crate::error::CdpError),
    ForcedReconnect(oneshot::Sender<ReconnectReport>),
}

pub struct Supervisor {
    browser: BrowserHandle,
    cmd_rx: CommandReceiver<LoopMessage>,
    control_rx: mpsc::Receiver<SupervisorControl>,
    state_tx: watch::Sender<ConnectionState>,
    reconnects: Arc<AtomicUsize>,
    registry: Arc<Mutex<SessionRegistry>>,
    buffers: Arc<EventBuffers>,
    policy: ReconnectPolicy,
    body_cap: usize,
    request_timeout: Duration,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        browser: BrowserHandle,
        cmd_rx: CommandReceiver<LoopMessage>,
        registry: Arc<Mutex<SessionRegistry>>,
        buffers: Arc<EventBuffers>,
        policy: ReconnectPolicy,
        body_cap: usize,
        request_timeout: Duration,
    ) -> (Self, SupervisorHandle) {
        let (control_tx, control_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let reconnects = Arc::new(AtomicUsize::new(0));

        let handle = SupervisorHandle {
            control: control_tx,
            state: state_rx,
            reconnects: Arc::clone(&reconnects),
        };
        let supervisor = Self {
            browser,
            cmd_rx,
            control_rx,
            state_tx,
            reconnects,
            registry,
            buffers,
            policy,
            body_cap,
            request_timeout,
        };
        (supervisor, handle)
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }

    /// Runs until shutdown. Owns the whole connect/run/reconnect cycle.
    pub async fn run(mut self) {
        let mut first_connect = true;
        // a reconnect request that arrived while not connected; answered
        // once the dial settles
        let mut pending_reply: Option<oneshot::Sender<ReconnectReport>> = None;

        'lifecycle: loop {
            self.set_state(if first_connect {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });

            let conn = match self.connect_with_budget(&mut pending_reply).await {
                ConnectOutcome::Connected(conn) => conn,
                ConnectOutcome::Shutdown => break 'lifecycle,
                ConnectOutcome::BudgetExhausted => {
                    self.set_state(ConnectionState::Failed);
                    warn!("reconnect budget exhausted, waiting for explicit reconnect");
                    self.reply(&mut pending_reply);
                    match self.control_rx.recv().await {
                        Some(SupervisorControl::Reconnect { tx }) => {
                            pending_reply = Some(tx);
                            continue 'lifecycle;
                        }
                        Some(SupervisorControl::Shutdown) | None => break 'lifecycle,
                    }
                }
            };

            if !first_connect {
                self.reconnects.fetch_add(1, Ordering::SeqCst);
            }
            first_connect = false;

            // discovery re-reports every live target on the new connection,
            // re-attaching sessions and re-enabling their event domains
            self.registry.lock().unwrap().begin_resync();
            self.set_state(ConnectionState::Connected);
            self.reply(&mut pending_reply);
            info!("browser connection established");

            // the loop future mutably borrows the command receiver, so the
            // select below only produces a verdict; state changes happen
            // after the future is dropped
            let verdict = {
                let event_loop = EventLoop::new(
                    conn,
                    &mut self.cmd_rx,
                    Arc::clone(&self.registry),
                    Arc::clone(&self.buffers),
                    self.body_cap,
                    self.request_timeout,
                );
                let loop_fut = event_loop.run();
                tokio::pin!(loop_fut);

                tokio::select! {
                    exit = &mut loop_fut => match exit {
                        LoopExit::Shutdown => RunVerdict::Shutdown,
                        LoopExit::Disconnected(err) => RunVerdict::Disconnected(err),
                    },
                    ctl = self.control_rx.recv() => match ctl {
                        Some(SupervisorControl::Reconnect { tx }) => RunVerdict::ForcedReconnect(tx),
                        Some(SupervisorControl::Shutdown) | None => RunVerdict::Shutdown,
                    },
                }
            };

            match verdict {
                RunVerdict::Shutdown => break 'lifecycle,
                RunVerdict::Disconnected(err) => {
                    warn!("browser connection lost: {err}");
                    self.set_state(ConnectionState::Degraded);
                }
                RunVerdict::ForcedReconnect(tx) => {
                    info!("manual reconnect requested");
                    pending_reply = Some(tx);
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.browser.close().await;
        self.reply(&mut pending_reply);
    }

    fn reply(&self, pending: &mut Option<oneshot::Sender<ReconnectReport>>) {
        if let Some(tx) = pending.take() {
            let _ = tx.send(ReconnectReport {
                state: *self.state_tx.borrow(),
                reconnect_count: self.reconnects.load(Ordering::SeqCst),
            });
        }
    }

    /// Dials until success, shutdown, or the attempt budget runs out. A
    /// manual reconnect request during backoff resets the budget.
    async fn connect_with_budget(
        &mut self,
        pending_reply: &mut Option<oneshot::Sender<ReconnectReport>>,
    ) -> ConnectOutcome {
        let mut attempt = 0usize;
        loop {
            if attempt >= self.policy.attempts {
                return ConnectOutcome::BudgetExhausted;
            }
            if attempt > 0 {
                let delay = self.policy.delay(attempt - 1);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    ctl = self.control_rx.recv() => match ctl {
                        Some(SupervisorControl::Reconnect { tx }) => {
                            // replace any older waiter, answering it with the
                            // in-progress state
                            self.reply(pending_reply);
                            *pending_reply = Some(tx);
                            attempt = 0;
                            continue;
                        }
                        Some(SupervisorControl::Shutdown) | None => {
                            return ConnectOutcome::Shutdown;
                        }
                    },
                }
            }
            attempt += 1;

            match self.try_connect().await {
                Ok(conn) => return ConnectOutcome::Connected(conn),
                Err(err) => {
                    warn!(attempt, "browser dial failed: {err}");
                }
            }
        }
    }

    async fn try_connect(&mut self) -> crate::error::Result<Connection> {
        let ws_url = self.browser.ensure_ws_url().await?;
        Connection::connect(&ws_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_match_wire_shape() {
        assert_eq!(ConnectionState::Connected.as_str(), "Connected");
        assert_eq!(
            serde_json::to_value(ConnectionState::Reconnecting).unwrap(),
            serde_json::json!("Reconnecting")
        );
    }
}
