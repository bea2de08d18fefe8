//! Common domain types

/// Maximum accepted length of a callback name
const MAX_CALLBACK_LEN: usize = 256;

/// Exit code reported when a command never produced a status
pub const NO_EXIT_CODE: i32 = -1;

/// Output stream of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// One line produced by a streaming job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            text: text.into(),
        }
    }
}

/// Result of a one-shot execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ExecutionResult {
    /// Stdout lines joined by newline
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }

    /// Stderr lines joined by newline
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Event types for a streaming spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data { stream: StreamKind, text: String },
    Exit { code: i32 },
    Error { code: i32, message: String },
}

impl From<OutputLine> for StreamEvent {
    fn from(line: OutputLine) -> Self {
        StreamEvent::Data {
            stream: line.stream,
            text: line.text,
        }
    }
}

/// Name of a script-side receiver.
///
/// Only dotted JavaScript identifier paths are accepted (`cb`, `window.ksu.cb_12`),
/// so the name can be spliced into generated script text as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackHandle(String);

impl CallbackHandle {
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_CALLBACK_LEN {
            return Err(crate::Error::InvalidCallback(format!(
                "callback name must be 1..={} bytes",
                MAX_CALLBACK_LEN
            )));
        }
        if !name.split('.').all(is_identifier) {
            return Err(crate::Error::InvalidCallback(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CallbackHandle {
    type Error = crate::Error;

    fn try_from(value: &str) -> crate::Result<Self> {
        Self::new(value)
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
