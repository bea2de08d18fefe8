//! Script generation for result delivery
//!
//! Every snippet evaluated in the view is built here. Receiver names come in as
//! validated [`CallbackHandle`]s and every string payload goes through
//! [`quote`], so no caller-controlled text reaches the script unescaped.

use serde_json::Value;

use crate::domain::types::{CallbackHandle, ExecutionResult, StreamEvent, NO_EXIT_CODE};

/// Quote a string as a script string literal.
///
/// JSON string encoding plus escapes for the two line terminators JSON allows
/// but older script parsers reject, and for `</` so the literal cannot close
/// an enclosing `<script>` element.
pub fn quote(text: &str) -> String {
    Value::String(text.to_owned())
        .to_string()
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
        .replace("</", "<\\/")
}

/// `callback(exitCode, stdout, stderr)` for a finished one-shot execution
pub fn exec_result(callback: &CallbackHandle, result: &ExecutionResult) -> String {
    exec_callback(
        callback,
        result.exit_code,
        &result.stdout_text(),
        &result.stderr_text(),
    )
}

/// `callback(-1, "", message)` for an execution that failed before producing a status
pub fn exec_failure(callback: &CallbackHandle, message: &str) -> String {
    exec_callback(callback, NO_EXIT_CODE, "", message)
}

/// Script for one streaming event
pub fn stream_event(callback: &CallbackHandle, event: &StreamEvent) -> String {
    match event {
        StreamEvent::Data { stream, text } => wrap(
            &format!(
                "{}.{}.emit('data', {})",
                callback,
                stream.as_str(),
                quote(text)
            ),
            "'emitData'",
        ),
        StreamEvent::Exit { code } => {
            wrap(&format!("{}.emit('exit', {})", callback, code), "'emitExit'")
        }
        StreamEvent::Error { code, message } => wrap(
            &format!(
                "var err = new Error({}); err.exitCode = {}; {}.emit('error', err)",
                quote(message),
                code,
                callback
            ),
            "'emitErr'",
        ),
    }
}

fn exec_callback(callback: &CallbackHandle, code: i32, stdout: &str, stderr: &str) -> String {
    wrap(
        &format!("{}({}, {}, {})", callback, code, quote(stdout), quote(stderr)),
        "'exec'",
    )
}

/// Isolate a call so a throwing receiver only logs to the console
fn wrap(call: &str, tag: &str) -> String {
    format!(
        "(function() {{ try {{ {}; }} catch(e) {{ console.error({}, e); }} }})();",
        call, tag
    )
}
