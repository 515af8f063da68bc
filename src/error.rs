use std::io;

use async_tungstenite::tungstenite;
use futures::channel::mpsc::SendError;
use futures::channel::oneshot::Canceled;
use thiserror::Error;

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

/// A failure in the transport or protocol layer between the daemon and the
/// browser.
#[derive(Debug, Error)]
pub enum CdpError {
    #[error("{0}")]
    Ws(#[from] tungstenite::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    /// The browser answered the call with a structured error.
    #[error("{0}")]
    Chrome(#[from] crate::cdp::CallError),
    #[error("received no response from the browser")]
    NoResponse,
    #[error("browser connection closed")]
    ConnectionClosed,
    #[error("not connected to a browser")]
    NotConnected,
    #[error("request timed out")]
    Timeout,
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("{0}")]
    ChannelSendError(#[from] ChannelError),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0}")]
    Send(#[from] SendError),
    #[error("{0}")]
    Canceled(#[from] Canceled),
}

impl From<Canceled> for CdpError {
    fn from(err: Canceled) -> Self {
        ChannelError::from(err).into()
    }
}

impl From<SendError> for CdpError {
    fn from(err: SendError) -> Self {
        ChannelError::from(err).into()
    }
}

impl CdpError {
    /// True for faults that mean the connection itself is gone, as opposed to
    /// a single call failing.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            CdpError::Ws(_) | CdpError::Io(_) | CdpError::ConnectionClosed | CdpError::NotConnected
        )
    }
}
