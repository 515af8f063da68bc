use std::borrow::Cow;
use std::collections::VecDeque;
use std::pin::Pin;

use async_tungstenite::tokio::ConnectStream;
use async_tungstenite::tungstenite;
use async_tungstenite::WebSocketStream;
use futures::stream::{FusedStream, Stream};
use futures::task::{Context, Poll};
use futures::Sink;
use tracing::{debug, error, trace};

use crate::cdp::{CallId, Message, OutboundCall};
use crate::error::{CdpError, Result};

/// The devtools websocket to one browser.
///
/// Outbound calls are queued and flushed while the stream is polled, so the
/// single task driving `poll_next` moves traffic in both directions. There
/// is no event-type parameter: every inbound frame decodes into the daemon's
/// one [`Message`] shape.
#[must_use = "streams do nothing unless polled"]
#[derive(Debug)]
pub struct Connection {
    /// Calls waiting to go out.
    pending_calls: VecDeque<OutboundCall>,
    /// The websocket to the browser instance.
    ws: WebSocketStream<ConnectStream>,
    /// Id the next submitted call will get.
    next_id: CallId,
    needs_flush: bool,
    /// The call currently in flight on the sink.
    pending_flush: Option<OutboundCall>,
}

impl Connection {
    pub async fn connect(debug_ws_url: impl AsRef<str>) -> Result<Self> {
        let (ws, _) = async_tungstenite::tokio::connect_async(debug_ws_url.as_ref()).await?;
        Ok(Self {
            pending_calls: Default::default(),
            ws,
            next_id: CallId::first(),
            needs_flush: false,
            pending_flush: None,
        })
    }

    /// Queue in the call to send over the socket and return the id assigned
    /// to it.
    pub fn submit_command(
        &mut self,
        method: Cow<'static, str>,
        session_id: Option<String>,
        params: serde_json::Value,
    ) -> CallId {
        let id = self.next_id;
        self.next_id = id.next();
        trace!(%id, %method, "submit command");
        self.pending_calls
            .push_back(OutboundCall::new(id, method, session_id, params));
        id
    }

    /// Flush any processed message and start sending the next over the sink.
    fn start_send_next(&mut self, cx: &mut Context<'_>) -> Result<()> {
        if self.needs_flush {
            if let Poll::Ready(Ok(())) = Sink::poll_flush(Pin::new(&mut self.ws), cx) {
                self.needs_flush = false;
            }
        }
        if self.pending_flush.is_none() && !self.needs_flush {
            if let Some(call) = self.pending_calls.pop_front() {
                let msg = serde_json::to_string(&call)?;
                Sink::start_send(Pin::new(&mut self.ws), msg.into())?;
                self.pending_flush = Some(call);
            }
        }
        Ok(())
    }
}

impl Stream for Connection {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();

        loop {
            // queue in the next message if not currently flushing
            if let Err(err) = pin.start_send_next(cx) {
                return Poll::Ready(Some(Err(err)));
            }

            // send the message
            if let Some(call) = pin.pending_flush.take() {
                if Sink::poll_ready(Pin::new(&mut pin.ws), cx).is_ready() {
                    pin.needs_flush = true;
                } else {
                    pin.pending_flush = Some(call);
                }
            }

            // read from the ws
            match Stream::poll_next(Pin::new(&mut pin.ws), cx) {
                Poll::Ready(Some(Ok(msg))) => match msg {
                    tungstenite::Message::Text(text) => {
                        return match serde_json::from_str::<Message>(&text) {
                            Ok(msg) => {
                                trace!(target: "webctl::conn", "received {}", text);
                                Poll::Ready(Some(Ok(msg)))
                            }
                            Err(err) => {
                                error!("failed to decode browser message: {err}: {text}");
                                Poll::Ready(Some(Err(err.into())))
                            }
                        };
                    }
                    tungstenite::Message::Close(_) => {
                        debug!("browser closed the devtools websocket");
                        return Poll::Ready(None);
                    }
                    // binary frames are not part of the protocol; pings are
                    // answered by tungstenite during flush
                    _ => continue,
                },
                Poll::Ready(Some(Err(err))) => {
                    return Poll::Ready(Some(Err(CdpError::Ws(err))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl FusedStream for Connection {
    fn is_terminated(&self) -> bool {
        false
    }
}
