//! Elevated shell sessions
//!
//! [`ElevatedShell`] is the boundary to whatever grants superuser execution.
//! The live implementation launches `su -c` per job through `tokio::process`.

use std::io::ErrorKind;
use std::ops::Deref;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::types::{ExecutionResult, OutputLine, StreamKind, NO_EXIT_CODE};
use crate::error::{Error, Result};

/// An elevated command-execution channel
#[async_trait]
pub trait ElevatedShell: Send + Sync {
    /// Run a command line to completion and collect its output
    async fn run(&self, command: &str) -> Result<ExecutionResult>;

    /// Run a command line, sending each output line as soon as it is read.
    ///
    /// Returns the exit code once the process has exited and both streams are drained.
    async fn run_streaming(
        &self,
        command: &str,
        output_tx: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<i32>;

    /// Release the session. Jobs still running on it are killed.
    fn close(&self);
}

/// Source of elevated shell sessions
#[async_trait]
pub trait ShellProvider: Send + Sync {
    /// Shared session used for one-shot execution
    fn ambient(&self) -> Arc<dyn ElevatedShell>;

    /// Open a session owned by a single job
    async fn open_session(&self) -> Result<Box<dyn ElevatedShell>>;
}

/// Closes the wrapped session when dropped
pub struct SessionGuard {
    session: Box<dyn ElevatedShell>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn ElevatedShell>) -> Self {
        Self { session }
    }
}

impl Deref for SessionGuard {
    type Target = dyn ElevatedShell;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
    }
}

/// How to start an elevated shell
#[derive(Debug, Clone)]
pub struct ShellLauncher {
    /// Shell binary, normally `su`
    pub program: String,
    /// Pass `--mount-master` so the shell sees the global mount namespace
    pub mount_master: bool,
}

impl ShellLauncher {
    pub fn new(program: impl Into<String>, mount_master: bool) -> Self {
        Self {
            program: program.into(),
            mount_master,
        }
    }

    fn spawn(&self, command: &str) -> Result<Child> {
        let mut cmd = Command::new(&self.program);
        if self.mount_master {
            cmd.arg("--mount-master");
        }
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                Error::ShellUnavailable(format!("{}: {}", self.program, e))
            }
            _ => Error::ShellLaunchFailed(e.to_string()),
        })
    }
}

/// How long output readers may keep going once the shell has exited.
///
/// A backgrounded child inherits the pipes and can hold them open forever;
/// completion follows the shell's exit, not pipe EOF.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Live elevated shell backed by `su`
pub struct SuShell {
    launcher: ShellLauncher,
    closed: watch::Sender<bool>,
}

impl SuShell {
    pub fn new(launcher: ShellLauncher) -> Self {
        let (closed, _) = watch::channel(false);
        Self { launcher, closed }
    }

    fn ensure_open(&self) -> Result<()> {
        if *self.closed.borrow() {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ElevatedShell for SuShell {
    async fn run(&self, command: &str) -> Result<ExecutionResult> {
        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        let exit_code = self.run_streaming(command, output_tx).await?;

        let mut result = ExecutionResult {
            exit_code,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        while let Some(line) = output_rx.recv().await {
            match line.stream {
                StreamKind::Stdout => result.stdout.push(line.text),
                StreamKind::Stderr => result.stderr.push(line.text),
            }
        }
        Ok(result)
    }

    async fn run_streaming(
        &self,
        command: &str,
        output_tx: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<i32> {
        self.ensure_open()?;
        let mut closed_rx = self.closed.subscribe();
        let mut child = self.launcher.spawn(command)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ProcessExecutionFailed("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ProcessExecutionFailed("stderr not captured".to_string()))?;

        let stdout_handle = read_lines(stdout, StreamKind::Stdout, output_tx.clone());
        let stderr_handle = read_lines(stderr, StreamKind::Stderr, output_tx);

        let closed_signal = async move {
            while !*closed_rx.borrow_and_update() {
                if closed_rx.changed().await.is_err() {
                    break;
                }
            }
        };

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = closed_signal => None,
        };

        let Some(status) = status else {
            debug!("Session closed while job was running, killing it");
            let _ = child.kill().await;
            stdout_handle.abort();
            stderr_handle.abort();
            return Err(Error::SessionClosed);
        };
        let status = status.map_err(|e| Error::ProcessExecutionFailed(e.to_string()))?;

        // Drain what is left in the pipes, bounded
        let deadline = Instant::now() + DRAIN_GRACE;
        tokio::join!(
            finish_reader(stdout_handle, deadline),
            finish_reader(stderr_handle, deadline)
        );

        Ok(status.code().unwrap_or(NO_EXIT_CODE))
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// Forward each line of `reader` as it arrives. Invalid UTF-8 is replaced, not fatal.
fn read_lines<R>(
    reader: R,
    stream: StreamKind,
    output_tx: mpsc::UnboundedSender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = OutputLine {
                        stream,
                        text: decode_line(&buf),
                    };
                    if output_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read {}: {}", stream.as_str(), e);
                    break;
                }
            }
        }
    })
}

/// Wait for a reader until `deadline`, then detach it from the pipe
async fn finish_reader(mut handle: JoinHandle<()>, deadline: Instant) {
    if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
        debug!("Output still open after exit, dropping reader");
        handle.abort();
        let _ = handle.await;
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Provider handing out live `su` sessions
pub struct SuShellProvider {
    launcher: ShellLauncher,
    ambient: Arc<SuShell>,
}

impl SuShellProvider {
    pub fn new(launcher: ShellLauncher) -> Self {
        Self {
            ambient: Arc::new(SuShell::new(launcher.clone())),
            launcher,
        }
    }
}

#[async_trait]
impl ShellProvider for SuShellProvider {
    fn ambient(&self) -> Arc<dyn ElevatedShell> {
        self.ambient.clone()
    }

    async fn open_session(&self) -> Result<Box<dyn ElevatedShell>> {
        Ok(Box::new(SuShell::new(self.launcher.clone())))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::domain::types::StreamKind;

    /// What every fake session does with a job
    #[derive(Debug, Clone, Default)]
    pub struct FakeScript {
        pub lines: Vec<OutputLine>,
        pub exit_code: i32,
        pub fail: Option<String>,
    }

    impl FakeScript {
        pub fn lines(exit_code: i32, lines: Vec<OutputLine>) -> Self {
            Self {
                lines,
                exit_code,
                fail: None,
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                fail: Some(message.to_string()),
                ..Self::default()
            }
        }
    }

    pub struct FakeShell {
        script: FakeScript,
        commands: Arc<Mutex<Vec<String>>>,
        closes: Arc<AtomicUsize>,
    }

    impl FakeShell {
        fn start(&self, command: &str) -> Result<()> {
            self.commands.lock().unwrap().push(command.to_string());
            match &self.script.fail {
                Some(message) => Err(Error::ShellLaunchFailed(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ElevatedShell for FakeShell {
        async fn run(&self, command: &str) -> Result<ExecutionResult> {
            self.start(command)?;
            let (stdout, stderr): (Vec<_>, Vec<_>) = self
                .script
                .lines
                .iter()
                .partition(|line| line.stream == StreamKind::Stdout);
            Ok(ExecutionResult {
                exit_code: self.script.exit_code,
                stdout: stdout.into_iter().map(|l| l.text.clone()).collect(),
                stderr: stderr.into_iter().map(|l| l.text.clone()).collect(),
            })
        }

        async fn run_streaming(
            &self,
            command: &str,
            output_tx: mpsc::UnboundedSender<OutputLine>,
        ) -> Result<i32> {
            self.start(command)?;
            for line in &self.script.lines {
                let _ = output_tx.send(line.clone());
            }
            Ok(self.script.exit_code)
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Provider whose sessions all follow one [`FakeScript`]
    pub struct FakeProvider {
        script: FakeScript,
        fail_open: bool,
        ambient: Arc<FakeShell>,
        commands: Arc<Mutex<Vec<String>>>,
        pub opened: AtomicUsize,
        pub closes: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        pub fn new(script: FakeScript) -> Self {
            let commands = Arc::new(Mutex::new(Vec::new()));
            let closes = Arc::new(AtomicUsize::new(0));
            Self {
                ambient: Arc::new(FakeShell {
                    script: script.clone(),
                    commands: commands.clone(),
                    closes: closes.clone(),
                }),
                script,
                fail_open: false,
                commands,
                opened: AtomicUsize::new(0),
                closes,
            }
        }

        pub fn failing_open(mut self) -> Self {
            self.fail_open = true;
            self
        }

        /// Command lines received so far, across all sessions
        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ShellProvider for FakeProvider {
        fn ambient(&self) -> Arc<dyn ElevatedShell> {
            self.ambient.clone()
        }

        async fn open_session(&self) -> Result<Box<dyn ElevatedShell>> {
            if self.fail_open {
                return Err(Error::ShellUnavailable("su: permission denied".to_string()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeShell {
                script: self.script.clone(),
                commands: self.commands.clone(),
                closes: self.closes.clone(),
            }))
        }
    }
}
