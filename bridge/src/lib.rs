//! WebUI command bridge
//!
//! Lets a module's web UI run commands through an elevated shell. Commands
//! are composed from a command string plus JSON options, executed on a
//! background runtime, and their results delivered back to the page as
//! generated scripts evaluated in order on the view's queue.

pub mod composer;
pub mod domain;
pub mod error;
pub mod infra;
pub mod script;
pub mod service;

pub use composer::{compose, CommandRequest};
pub use domain::{CallbackHandle, ExecutionResult, Module, ModuleInfo, OutputLine, StreamEvent, StreamKind};
pub use error::{Error, Result};
pub use infra::module_fs::{LocalModuleFs, ModuleFs};
pub use infra::shell::{ElevatedShell, SessionGuard, ShellLauncher, ShellProvider, SuShell, SuShellProvider};
pub use service::bridge::ExecutionBridge;
pub use service::delivery::{DeliveryChannel, WebView};
pub use service::modules::{list_modules, webroot_path, ModuleService};
