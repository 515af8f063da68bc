//! Daemon configuration and the per-user runtime paths.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Reconnect policy for the connection supervisor: exponential backoff from
/// `base` capped at `cap`, with a hard attempt budget.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub attempts: usize,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(5),
            attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before the given zero-based attempt.
    pub fn delay(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        let delay = self.base.saturating_mul(2u32.saturating_pow(exp));
        delay.min(self.cap)
    }
}

/// How the daemon gets hold of a browser.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Determines whether to run a headless version of the browser. Defaults
    /// to true.
    pub headless: bool,
    /// Determines whether to run the browser with a sandbox.
    pub sandbox: bool,
    /// Launch the browser with a specific window width and height.
    pub window_size: Option<(u32, u32)>,
    /// Path for Chrome or Chromium.
    ///
    /// If unspecified, the daemon will try to automatically detect a
    /// suitable binary.
    pub executable: Option<PathBuf>,
    /// Additional command line arguments for the browser process.
    pub args: Vec<String>,
    /// Environment variables to set for the browser process.
    pub process_envs: Option<HashMap<String, String>>,
    /// Attach to an already-running browser at this devtools HTTP endpoint
    /// (e.g. `http://127.0.0.1:9222`) instead of launching one.
    pub attach_url: Option<String>,
    /// How long to wait for the devtools endpoint to come up after spawning
    /// the process.
    pub launch_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            window_size: None,
            executable: None,
            args: vec![],
            process_envs: None,
            attach_url: None,
            launch_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub browser: BrowserConfig,
    /// Capacity of the console ring buffer.
    pub console_capacity: usize,
    /// Capacity of the network ring buffer.
    pub network_capacity: usize,
    /// Largest response body the network capture will keep per entry; larger
    /// bodies are truncated and flagged.
    pub network_body_max: usize,
    /// Largest accepted IPC request frame.
    pub max_frame_bytes: usize,
    /// Upper bound for browser calls unless a command supplies its own.
    pub request_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Override for the socket/pid directory; defaults to the per-user
    /// runtime directory.
    pub runtime_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            console_capacity: 1000,
            network_capacity: 1000,
            network_body_max: 256 * 1024,
            max_frame_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
            runtime_dir: None,
        }
    }
}

impl Config {
    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(dir.into());
        self
    }

    pub fn with_attach_url(mut self, url: impl Into<String>) -> Self {
        self.browser.attach_url = Some(url.into());
        self
    }
}

/// Socket and pid file locations for one daemon instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub dir: PathBuf,
    pub socket: PathBuf,
    pub pid: PathBuf,
}

impl RuntimePaths {
    /// `$XDG_RUNTIME_DIR/webctl` when set, `/tmp/webctl-<uid>` otherwise.
    pub fn resolve(config: &Config) -> Self {
        let dir = config.runtime_dir.clone().unwrap_or_else(default_dir);
        Self::in_dir(dir)
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        let socket = dir.join("webctl.sock");
        let pid = dir.join("webctl.pid");
        Self { dir, socket, pid }
    }
}

fn default_dir() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(runtime) if !runtime.is_empty() => PathBuf::from(runtime).join("webctl"),
        _ => {
            let uid = nix::unistd::Uid::current();
            PathBuf::from(format!("/tmp/webctl-{uid}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(5), Duration::from_millis(3200));
        assert_eq!(policy.delay(6), Duration::from_secs(5));
        assert_eq!(policy.delay(60), Duration::from_secs(5));
    }

    #[test]
    fn paths_are_siblings() {
        let paths = RuntimePaths::in_dir(PathBuf::from("/run/user/1000/webctl"));
        assert_eq!(paths.socket, PathBuf::from("/run/user/1000/webctl/webctl.sock"));
        assert_eq!(paths.pid, PathBuf::from("/run/user/1000/webctl/webctl.pid"));
    }
}
