//! Supervision of the local lookup service process.
//!
//! The service ships as a platform executable next to the plugin. The
//! supervisor starts it with the plugin directory as working directory,
//! forwards its output to the log, notices when it exits and stops it on
//! request.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Never started.
    Ready,
    Running,
    /// Exited on its own.
    Stopped,
    /// Stopped on request.
    Off,
    MissingFile,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceStatus::Ready => "Ready",
            ServiceStatus::Running => "Running",
            ServiceStatus::Stopped => "Stopped",
            ServiceStatus::Off => "Off",
            ServiceStatus::MissingFile => "Missing File",
        };
        write!(f, "Bible Server: {}", label)
    }
}

/// Executable file name for an OS as named by `std::env::consts::OS`.
pub fn executable_name(os: &str) -> Result<&'static str> {
    match os {
        "windows" => Ok("bible-server-win.exe"),
        "macos" => Ok("bible-server-mac"),
        "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Ok("bible-server"),
        other => Err(Error::UnsupportedPlatform(other.to_string())),
    }
}

struct RunningService {
    stop: oneshot::Sender<()>,
    watcher: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

pub struct ServiceSupervisor {
    plugin_dir: PathBuf,
    executable: PathBuf,
    status: Arc<Mutex<ServiceStatus>>,
    running: Option<RunningService>,
}

impl ServiceSupervisor {
    /// Supervisor for this platform's executable inside `plugin_dir`.
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Result<Self> {
        let name = executable_name(std::env::consts::OS)?;
        Ok(Self::with_executable(plugin_dir, name))
    }

    pub fn with_executable(plugin_dir: impl Into<PathBuf>, file_name: &str) -> Self {
        let plugin_dir = plugin_dir.into();
        Self {
            executable: plugin_dir.join(file_name),
            plugin_dir,
            status: Arc::new(Mutex::new(ServiceStatus::Ready)),
            running: None,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(ServiceStatus::Stopped)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.running.as_ref().map(|r| r.started_at)
    }

    pub fn is_running(&self) -> bool {
        self.status() == ServiceStatus::Running
    }

    fn set_status(&self, status: ServiceStatus) {
        set_status(&self.status, status);
    }

    pub async fn start(&mut self) -> Result<ServiceStatus> {
        if self.running.is_some() && self.is_running() {
            return Ok(ServiceStatus::Running);
        }
        // A previous child that exited on its own leaves its watcher behind.
        if let Some(previous) = self.running.take() {
            let _ = previous.watcher.await;
        }

        if !self.executable.exists() {
            warn!("Server executable not found at {}", self.executable.display());
            self.set_status(ServiceStatus::MissingFile);
            return Err(Error::ServiceMissing {
                path: self.executable.clone(),
            });
        }
        mark_executable(&self.executable);

        info!("Starting {}", self.executable.display());
        let mut child = Command::new(&self.executable)
            .current_dir(&self.plugin_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        // Before the watcher exists, so a fast exit is not overwritten.
        self.set_status(ServiceStatus::Running);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, true));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let status = Arc::clone(&self.status);
        let watcher = tokio::spawn(async move {
            tokio::select! {
                exit = child.wait() => {
                    match exit {
                        Ok(code) => info!("Bible server process exited with {}", code),
                        Err(e) => warn!("Could not wait for bible server: {}", e),
                    }
                    set_status(&status, ServiceStatus::Stopped);
                }
                _ = stop_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Could not kill bible server: {}", e);
                    }
                }
            }
        });

        self.running = Some(RunningService {
            stop: stop_tx,
            watcher,
            started_at: Utc::now(),
        });
        Ok(ServiceStatus::Running)
    }

    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let uptime = Utc::now() - running.started_at;
            info!("Stopping bible server after {}s", uptime.num_seconds());
            // Already exited if the receiver is gone.
            let _ = running.stop.send(());
            let _ = running.watcher.await;
            self.set_status(ServiceStatus::Off);
        }
    }

    pub async fn restart(&mut self) -> Result<ServiceStatus> {
        self.stop().await;
        self.start().await
    }
}

fn set_status(slot: &Mutex<ServiceStatus>, status: ServiceStatus) {
    if let Ok(mut current) = slot.lock() {
        *current = status;
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(stream: R, is_stderr: bool) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            warn!(target: "verses::service", "{}", line);
        } else {
            info!(target: "verses::service", "{}", line);
        }
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)) {
        warn!("Could not mark {} executable: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) {}
