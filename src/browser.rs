//! Browser process management: launching a Chromium instance and resolving
//! the devtools websocket endpoint, or attaching to one that is already
//! running.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::error::{CdpError, Result};

/// Flags the daemon always passes to a launched browser. Mirrors what the
/// devtools ecosystem uses for unattended automation.
static DEFAULT_ARGS: [&str; 10] = [
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-breakpad",
    "--disable-default-apps",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-sync",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-default-browser-check",
];

/// A running (or attached) browser plus the websocket url commands go to.
#[derive(Debug)]
pub struct BrowserHandle {
    config: BrowserConfig,
    child: Option<Child>,
    ws_url: Option<String>,
}

impl BrowserHandle {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            child: None,
            ws_url: None,
        }
    }

    /// The devtools websocket url, launching or re-resolving as needed.
    ///
    /// In launch mode a dead child process is replaced; in attach mode the
    /// endpoint is re-queried so a restarted browser is picked up.
    pub async fn ensure_ws_url(&mut self) -> Result<String> {
        if let Some(url) = &self.config.attach_url {
            let ws = resolve_ws_url(url).await?;
            self.ws_url = Some(ws.clone());
            return Ok(ws);
        }

        let child_running = match self.child.as_mut() {
            Some(child) => child.try_wait().map(|status| status.is_none())?,
            None => false,
        };
        if !child_running {
            if self.child.is_some() {
                warn!("browser process exited, relaunching");
            }
            self.launch().await?;
        }
        self.ws_url
            .clone()
            .ok_or_else(|| CdpError::Launch("no devtools endpoint".to_string()))
    }

    async fn launch(&mut self) -> Result<()> {
        let executable = match &self.config.executable {
            Some(path) => path.clone(),
            None => default_executable().map_err(CdpError::Launch)?,
        };

        let mut cmd = Command::new(&executable);
        cmd.args(DEFAULT_ARGS);
        cmd.arg("--remote-debugging-port=0");
        if self.config.headless {
            cmd.args(["--headless", "--disable-gpu", "--hide-scrollbars", "--mute-audio"]);
        }
        if !self.config.sandbox {
            cmd.args(["--no-sandbox", "--disable-setuid-sandbox"]);
        }
        if let Some((width, height)) = self.config.window_size {
            cmd.arg(format!("--window-size={width},{height}"));
        }
        cmd.args(&self.config.args);
        cmd.arg("about:blank");
        if let Some(envs) = &self.config.process_envs {
            cmd.envs(envs);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(executable = %executable.display(), "spawning browser");
        let mut child = cmd.spawn()?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CdpError::Launch("no stderr handle on browser process".to_string()))?;

        let ws_url = tokio::time::timeout(
            self.config.launch_timeout,
            ws_url_from_output(BufReader::new(stderr)),
        )
        .await
        .map_err(|_| CdpError::Launch("timed out waiting for devtools endpoint".to_string()))??;

        info!(%ws_url, pid = child.id(), "browser launched");
        self.child = Some(child);
        self.ws_url = Some(ws_url);
        Ok(())
    }

    /// Kills a launched browser process. A no-op in attach mode.
    pub async fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                warn!("failed to kill browser process: {err}");
            }
            let _ = child.wait().await;
        }
        self.ws_url = None;
    }
}

/// Scans browser output for the `DevTools listening on ws://…` line.
async fn ws_url_from_output<R>(mut reader: BufReader<R>) -> Result<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(CdpError::Launch(
                "browser exited before reporting a devtools endpoint".to_string(),
            ));
        }
        if let Some((_, ws)) = line.split_once("DevTools listening on ") {
            return Ok(ws.trim().to_string());
        }
    }
}

/// Asks a devtools HTTP endpoint for its browser websocket url.
async fn resolve_ws_url(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim_end_matches('/');
    let version_url = url::Url::parse(&format!("{endpoint}/json/version"))
        .map_err(|err| CdpError::Launch(format!("invalid attach url: {err}")))?;
    let body = reqwest::get(version_url)
        .await
        .map_err(|err| CdpError::Launch(format!("devtools endpoint unreachable: {err}")))?
        .text()
        .await
        .map_err(|err| CdpError::Launch(format!("devtools endpoint unreadable: {err}")))?;
    let version: serde_json::Value = serde_json::from_str(&body)?;
    version
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| CdpError::Launch("endpoint reported no webSocketDebuggerUrl".to_string()))
}

/// Returns the path to the browser executable.
///
/// If the `CHROME` environment variable is set, it is used as the default
/// path. Otherwise the filenames `google-chrome-stable`, `chromium`,
/// `chromium-browser`, `chrome` and `chrome-browser` are searched for in
/// standard places.
pub fn default_executable() -> std::result::Result<PathBuf, String> {
    if let Ok(path) = std::env::var("CHROME") {
        if std::path::Path::new(&path).exists() {
            return Ok(path.into());
        }
    }

    for app in &[
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
        "chrome-browser",
    ] {
        if let Ok(path) = which::which(app) {
            return Ok(path);
        }
    }

    Err("could not auto detect a chrome executable".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn finds_ws_url_in_stderr_noise() {
        let output = b"[warning] something unrelated\n\
            DevTools listening on ws://127.0.0.1:34567/devtools/browser/abc-def\n" as &[u8];
        let ws = ws_url_from_output(BufReader::new(output)).await.unwrap();
        assert_eq!(ws, "ws://127.0.0.1:34567/devtools/browser/abc-def");
    }

    #[tokio::test]
    async fn errors_when_process_output_ends() {
        let output = b"no endpoint here\n" as &[u8];
        let err = ws_url_from_output(BufReader::new(output)).await.unwrap_err();
        assert!(matches!(err, CdpError::Launch(_)));
    }
}
