//! Daemon lifecycle: single-instance locking, component startup order, and
//! graceful teardown on `shutdown`, SIGINT, or SIGTERM.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::channel::mpsc;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::browser::BrowserHandle;
use crate::capture::EventBuffers;
use crate::config::{Config, RuntimePaths};
use crate::dispatch::CommandContext;
use crate::driver::Driver;
use crate::error::CdpError;
use crate::handler::session::SessionRegistry;
use crate::ipc::{IpcError, IpcServer};
use crate::supervisor::{ConnectionState, Supervisor};

/// Capacity of the driver→event-loop command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("already running")]
    AlreadyRunning,
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Browser(#[from] CdpError),
}

impl From<IpcError> for DaemonError {
    fn from(err: IpcError) -> Self {
        match err {
            IpcError::AlreadyRunning => DaemonError::AlreadyRunning,
            IpcError::Io(err) => DaemonError::Io(err),
        }
    }
}

/// Broadcast flag that starts graceful teardown. Triggering is idempotent.
#[derive(Clone)]
pub struct ShutdownSignal(Arc<watch::Sender<bool>>);

impl ShutdownSignal {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self(Arc::new(tx)), rx)
    }

    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.0.subscribe()
    }
}

/// The pid-file half of the single-instance guarantee (the socket probe in
/// [`IpcServer::bind`] is the other half). Held for the daemon's lifetime;
/// dropping it releases the file on every exit path.
#[derive(Debug)]
pub struct InstanceLock {
    pid_path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(paths: &RuntimePaths) -> Result<Self, DaemonError> {
        std::fs::create_dir_all(&paths.dir)?;
        std::fs::set_permissions(&paths.dir, std::fs::Permissions::from_mode(0o700))?;

        if let Ok(contents) = std::fs::read_to_string(&paths.pid) {
            match contents.trim().parse::<i32>() {
                Ok(pid) if pid_alive(pid) => return Err(DaemonError::AlreadyRunning),
                _ => {
                    info!(pid_file = %paths.pid.display(), "removing stale pid file");
                    let _ = std::fs::remove_file(&paths.pid);
                }
            }
        }

        std::fs::write(&paths.pid, format!("{}\n", std::process::id()))?;
        std::fs::set_permissions(&paths.pid, std::fs::Permissions::from_mode(0o600))?;
        Ok(Self {
            pid_path: paths.pid.clone(),
        })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.pid_path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("failed to remove pid file: {err}");
            }
        }
    }
}

/// True when a process with the pid exists (even one owned by another user).
fn pid_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Runs the daemon to completion.
///
/// Startup order: instance lock, browser, registry/capture/driver loop, IPC
/// server, supervisor watchdog. Teardown happens in reverse and is
/// idempotent.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let paths = RuntimePaths::resolve(&config);
    let _lock = InstanceLock::acquire(&paths)?;

    let browser = BrowserHandle::new(config.browser.clone());
    let buffers = Arc::new(EventBuffers::new(
        config.console_capacity,
        config.network_capacity,
    ));
    let registry = Arc::new(Mutex::new(SessionRegistry::new()));

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (supervisor, supervisor_handle) = Supervisor::new(
        browser,
        cmd_rx,
        Arc::clone(&registry),
        Arc::clone(&buffers),
        config.reconnect.clone(),
        config.network_body_max,
        config.request_timeout,
    );
    let driver = Driver::new(
        cmd_tx,
        supervisor_handle.state_watch(),
        config.request_timeout,
    );

    let supervisor_task = tokio::spawn(supervisor.run());

    // hold the socket until the browser is actually reachable; a daemon
    // that cannot drive a browser should fail its start, not limp
    let mut state_rx = supervisor_handle.state_watch();
    loop {
        match *state_rx.borrow_and_update() {
            ConnectionState::Connected => break,
            ConnectionState::Failed => {
                supervisor_handle.shutdown().await;
                let _ = supervisor_task.await;
                return Err(DaemonError::Browser(CdpError::Launch(
                    "browser did not come up".to_string(),
                )));
            }
            _ => {}
        }
        if state_rx.changed().await.is_err() {
            return Err(DaemonError::Browser(CdpError::NotConnected));
        }
    }

    let server = match IpcServer::bind(&paths, config.max_frame_bytes).await {
        Ok(server) => server,
        Err(err) => {
            supervisor_handle.shutdown().await;
            let _ = supervisor_task.await;
            return Err(err.into());
        }
    };
    let ctx = CommandContext {
        buffers,
        registry,
        driver,
        supervisor: supervisor_handle.clone(),
    };
    let (shutdown, mut shutdown_rx) = ShutdownSignal::new();
    let server_task = tokio::spawn(server.serve(ctx, shutdown.clone()));

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = shutdown_rx.changed() => info!("shutdown command received"),
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    // reverse order: stop accepting and drain handlers, then the
    // supervisor detaches and closes the browser
    shutdown.trigger();
    let _ = server_task.await;
    supervisor_handle.shutdown().await;
    let _ = supervisor_task.await;

    info!("daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_blocks_second_instance_and_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());

        let lock = InstanceLock::acquire(&paths).unwrap();
        assert!(paths.pid.exists());

        // the pid file names this (live) process
        let second = InstanceLock::acquire(&paths);
        assert!(matches!(second, Err(DaemonError::AlreadyRunning)));

        drop(lock);
        assert!(!paths.pid.exists());
    }

    #[test]
    fn stale_pid_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());

        // far beyond any default pid_max, so the probe reports it dead
        std::fs::create_dir_all(&paths.dir).unwrap();
        std::fs::write(&paths.pid, "1999999999\n").unwrap();

        let lock = InstanceLock::acquire(&paths).unwrap();
        let written = std::fs::read_to_string(&paths.pid).unwrap();
        assert_eq!(written.trim().parse::<u32>().unwrap(), std::process::id());
        drop(lock);
    }

    #[test]
    fn garbage_pid_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::in_dir(dir.path().to_path_buf());
        std::fs::create_dir_all(&paths.dir).unwrap();
        std::fs::write(&paths.pid, "not a pid\n").unwrap();

        assert!(InstanceLock::acquire(&paths).is_ok());
    }

    #[test]
    fn own_pid_is_alive_and_nonsense_is_not() {
        assert!(pid_alive(std::process::id() as i32));
        assert!(!pid_alive(0));
        assert!(!pid_alive(-4));
    }
}
