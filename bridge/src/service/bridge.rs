//! Execution bridge
//!
//! The operations a module's web UI can call. Shell work runs on the
//! background runtime; results come back to the page as generated scripts
//! posted through the [`DeliveryChannel`].

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::composer::compose;
use crate::domain::module::ModuleInfo;
use crate::domain::types::{
    CallbackHandle, ExecutionResult, OutputLine, StreamEvent, StreamKind, NO_EXIT_CODE,
};
use crate::error::Result;
use crate::infra::shell::{SessionGuard, ShellProvider};
use crate::script;
use crate::service::delivery::DeliveryChannel;

/// Bridge between one hosted module page and the elevated shell
pub struct ExecutionBridge {
    shells: Arc<dyn ShellProvider>,
    delivery: DeliveryChannel,
    module: ModuleInfo,
    runtime: Handle,
}

impl ExecutionBridge {
    /// Create a bridge for the module at `module_dir`
    pub fn new(
        shells: Arc<dyn ShellProvider>,
        delivery: DeliveryChannel,
        module_dir: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            shells,
            delivery,
            module: ModuleInfo::from_dir(module_dir),
            runtime,
        }
    }

    /// The hosted module
    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    /// Run a command and return its trimmed stdout, blocking the calling thread.
    ///
    /// Exit code and stderr are discarded. Must not be called from a runtime
    /// worker thread; use [`exec_output`](Self::exec_output) there.
    pub fn exec_sync(&self, command: &str, options: Option<&str>) -> Result<String> {
        self.runtime.block_on(self.exec_output(command, options))
    }

    /// Async form of [`exec_sync`](Self::exec_sync)
    pub async fn exec_output(&self, command: &str, options: Option<&str>) -> Result<String> {
        let result = run_exec(self.shells.as_ref(), command, options).await?;
        Ok(result.stdout_text().trim().to_string())
    }

    /// Run a command in the background and report to `callback`.
    ///
    /// The callback receives `(exitCode, stdout, stderr)`, also for a non-zero
    /// exit. Failures before a status exists are reported as
    /// `(-1, "", message)`. Without a callback the result is discarded.
    pub fn exec(
        &self,
        command: &str,
        options: Option<&str>,
        callback: Option<&str>,
    ) -> Result<JoinHandle<()>> {
        let callback = callback.map(CallbackHandle::new).transpose()?;
        let shells = self.shells.clone();
        let delivery = self.delivery.clone();
        let command = command.to_string();
        let options = options.map(str::to_string);

        let span = info_span!("exec", call_id = %Uuid::new_v4(), module = %self.module.id);
        info!(parent: &span, "Dispatching command: {}", command);

        let task = async move {
            let outcome = run_exec(shells.as_ref(), &command, options.as_deref()).await;
            match (callback, outcome) {
                (Some(callback), Ok(result)) => {
                    debug!("Command exited with {}", result.exit_code);
                    delivery.post_script(script::exec_result(&callback, &result));
                }
                (Some(callback), Err(e)) => {
                    warn!("Command failed: {}", e);
                    delivery.post_script(script::exec_failure(&callback, &e.to_string()));
                }
                (None, Ok(result)) => {
                    debug!("Command exited with {}, no callback", result.exit_code);
                }
                (None, Err(e)) => warn!("Command failed, no callback: {}", e),
            }
        };

        Ok(self.runtime.spawn(task.instrument(span)))
    }

    /// Run a command on a dedicated session, streaming its output to `callback`.
    ///
    /// Emits `callback.stdout`/`callback.stderr` data events per line, then
    /// `exit`, then `error` when the exit code is non-zero. `args` is accepted
    /// for compatibility and not used.
    pub fn spawn(
        &self,
        command: &str,
        args: &str,
        options: Option<&str>,
        callback: &str,
    ) -> Result<JoinHandle<()>> {
        let callback = CallbackHandle::new(callback)?;
        let shells = self.shells.clone();
        let delivery = self.delivery.clone();
        let command = command.to_string();
        let options = options.map(str::to_string);

        let span = info_span!("spawn", call_id = %Uuid::new_v4(), module = %self.module.id);
        info!(parent: &span, "Spawning command: {}", command);
        if !args.is_empty() && args != "[]" {
            debug!(parent: &span, "Ignoring spawn args: {}", args);
        }

        let task = async move {
            let emit = |event: StreamEvent| {
                delivery.post_script(script::stream_event(&callback, &event));
            };

            let outcome = run_spawn(
                shells.as_ref(),
                &command,
                options.as_deref(),
                |line| emit(line.into()),
            )
            .await;

            match outcome {
                Ok((code, stderr)) => {
                    debug!("Spawned command exited with {}", code);
                    emit(StreamEvent::Exit { code });
                    if code != 0 {
                        emit(StreamEvent::Error {
                            code,
                            message: stderr.join("\n"),
                        });
                    }
                }
                Err(e) => {
                    warn!("Spawned command failed: {}", e);
                    emit(StreamEvent::Exit { code: NO_EXIT_CODE });
                    emit(StreamEvent::Error {
                        code: NO_EXIT_CODE,
                        message: e.to_string(),
                    });
                }
            }
        };

        Ok(self.runtime.spawn(task.instrument(span)))
    }

    /// Show a short notification over the page
    pub fn toast(&self, message: &str) {
        self.delivery.post_toast(message.to_string());
    }

    /// Hide or restore the system bars
    pub fn full_screen(&self, enable: bool) {
        self.delivery.post_full_screen(enable);
    }

    /// JSON description of the hosted module
    pub fn module_info(&self) -> String {
        serde_json::to_string(&self.module).unwrap_or_default()
    }
}

async fn run_exec(
    shells: &dyn ShellProvider,
    command: &str,
    options: Option<&str>,
) -> Result<ExecutionResult> {
    let line = compose(command, options)?;
    shells.ambient().run(&line).await
}

/// Run a streaming job; returns the exit code and the collected stderr lines
async fn run_spawn(
    shells: &dyn ShellProvider,
    command: &str,
    options: Option<&str>,
    on_line: impl Fn(OutputLine),
) -> Result<(i32, Vec<String>)> {
    let line = compose(command, options)?;
    let session = SessionGuard::new(shells.open_session().await?);

    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<OutputLine>();
    let forward = async {
        let mut stderr = Vec::new();
        while let Some(line) = output_rx.recv().await {
            if line.stream == StreamKind::Stderr {
                stderr.push(line.text.clone());
            }
            on_line(line);
        }
        stderr
    };

    let (code, stderr) = tokio::join!(session.run_streaming(&line, output_tx), forward);
    Ok((code?, stderr))
}
