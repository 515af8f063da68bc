//! webctl: a browser-automation control daemon.
//!
//! A long-lived supervisor process owns one Chromium instance over the
//! Chrome DevTools Protocol, continuously captures console and network
//! telemetry into bounded in-memory buffers, tracks open page targets, and
//! answers newline-delimited JSON commands on a per-user Unix socket.

pub mod browser;
pub mod capture;
pub mod cdp;
pub mod config;
pub mod conn;
pub mod daemon;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod handler;
pub mod ipc;
pub mod keys;
pub mod ring;
pub mod supervisor;

pub use config::{BrowserConfig, Config, ReconnectPolicy, RuntimePaths};
pub use daemon::{run, DaemonError};
pub use error::CdpError;
pub use ipc::protocol::{CmdError, Request, Response};
pub use supervisor::ConnectionState;
