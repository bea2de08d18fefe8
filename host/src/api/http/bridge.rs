//! Bridge WebSocket
//!
//! One connection per hosted page. Requests arrive as JSON frames; view
//! tasks posted by the bridge travel back on the same socket.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webui_bridge::{DeliveryChannel, Error, ExecutionBridge, WebView};

use super::origin::SameOrigin;
use crate::{AppState, Result};

/// Request frame sent by the page
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Frame sent to the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    Result {
        id: u64,
        value: Value,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        code: u32,
        message: String,
    },
    Eval {
        script: String,
    },
    Toast {
        message: String,
    },
    FullScreen {
        enable: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ExecParams {
    command: String,
    #[serde(default)]
    options: Value,
    #[serde(default)]
    callback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpawnParams {
    command: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    options: Value,
    callback: String,
}

#[derive(Debug, Deserialize)]
struct ToastParams {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FullScreenParams {
    enable: bool,
}

/// View whose tasks are forwarded to the page as frames
pub struct SocketView {
    frames: mpsc::UnboundedSender<ServerFrame>,
}

impl SocketView {
    pub fn new(frames: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self { frames }
    }

    fn send(&self, frame: ServerFrame) {
        if self.frames.send(frame).is_err() {
            debug!("Socket gone, dropping view task");
        }
    }
}

impl WebView for SocketView {
    fn evaluate_javascript(&self, script: &str) {
        self.send(ServerFrame::Eval {
            script: script.to_string(),
        });
    }

    fn show_toast(&self, message: &str) {
        self.send(ServerFrame::Toast {
            message: message.to_string(),
        });
    }

    fn set_full_screen(&self, enable: bool) {
        self.send(ServerFrame::FullScreen { enable });
    }

    fn is_screen(&self) -> bool {
        true
    }
}

/// WebSocket handler for a module's bridge
pub async fn bridge_websocket(
    _origin: SameOrigin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let module_dir = state.modules.module_dir(&id).await?;
    Ok(ws.on_upgrade(move |socket| handle_bridge_socket(socket, state, module_dir)))
}

async fn handle_bridge_socket(socket: WebSocket, state: AppState, module_dir: PathBuf) {
    let (mut sink, mut stream) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<ServerFrame>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let (delivery, _queue) = DeliveryChannel::attach(Arc::new(SocketView::new(frame_tx.clone())));
    let bridge = Arc::new(ExecutionBridge::new(
        state.shells.clone(),
        delivery,
        module_dir.to_string_lossy(),
        Handle::current(),
    ));
    info!("Bridge connected for module {}", bridge.module().id);

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(frame) => dispatch(&bridge, frame).await,
            Err(e) => {
                let err = Error::InvalidParameter(format!("malformed frame: {}", e));
                ServerFrame::Error {
                    id: None,
                    code: err.code(),
                    message: err.to_string(),
                }
            }
        };
        if frame_tx.send(reply).is_err() {
            break;
        }
    }

    info!("Bridge disconnected for module {}", bridge.module().id);
    writer.abort();
}

/// Run one request and build its reply
async fn dispatch(bridge: &Arc<ExecutionBridge>, frame: ClientFrame) -> ServerFrame {
    let id = frame.id;
    debug!("Bridge call {} {}", id, frame.method);
    match call(bridge, &frame.method, frame.params).await {
        Ok(value) => ServerFrame::Result { id, value },
        Err(e) => ServerFrame::Error {
            id: Some(id),
            code: e.code(),
            message: e.to_string(),
        },
    }
}

async fn call(
    bridge: &Arc<ExecutionBridge>,
    method: &str,
    params: Value,
) -> webui_bridge::Result<Value> {
    match method {
        "exec" => {
            let p: ExecParams = parse_params(params)?;
            let options = options_text(p.options);
            match p.callback {
                Some(callback) => {
                    bridge.exec(&p.command, options.as_deref(), Some(&callback))?;
                    Ok(Value::Null)
                }
                None => {
                    let bridge = bridge.clone();
                    let output = tokio::task::spawn_blocking(move || {
                        bridge.exec_sync(&p.command, options.as_deref())
                    })
                    .await
                    .map_err(|e| Error::Internal(e.to_string()))??;
                    Ok(Value::String(output))
                }
            }
        }
        "spawn" => {
            let p: SpawnParams = parse_params(params)?;
            let args = match p.args {
                Value::Null => String::new(),
                Value::String(args) => args,
                other => other.to_string(),
            };
            bridge.spawn(
                &p.command,
                &args,
                options_text(p.options).as_deref(),
                &p.callback,
            )?;
            Ok(Value::Null)
        }
        "toast" => {
            let p: ToastParams = parse_params(params)?;
            bridge.toast(&p.message);
            Ok(Value::Null)
        }
        "fullScreen" => {
            let p: FullScreenParams = parse_params(params)?;
            bridge.full_screen(p.enable);
            Ok(Value::Null)
        }
        "moduleInfo" => Ok(Value::String(bridge.module_info())),
        other => Err(Error::InvalidParameter(format!("unknown method: {}", other))),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> webui_bridge::Result<T> {
    serde_json::from_value(params).map_err(|e| Error::InvalidParameter(e.to_string()))
}

/// Options may arrive as the JSON text the page API takes, or as an object
fn options_text(options: Value) -> Option<String> {
    match options {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use webui_bridge::{ShellLauncher, SuShellProvider};

    use super::*;

    fn connect() -> (Arc<ExecutionBridge>, mpsc::UnboundedReceiver<ServerFrame>) {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (delivery, _) = DeliveryChannel::attach(Arc::new(SocketView::new(frame_tx)));
        let bridge = ExecutionBridge::new(
            Arc::new(SuShellProvider::new(ShellLauncher::new("sh", false))),
            delivery,
            "/data/adb/modules/demo",
            Handle::current(),
        );
        (Arc::new(bridge), frame_rx)
    }

    fn frame(id: u64, method: &str, params: Value) -> ClientFrame {
        ClientFrame {
            id,
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_without_callback_returns_output() {
        let (bridge, _frames) = connect();
        let reply = dispatch(
            &bridge,
            frame(
                1,
                "exec",
                serde_json::json!({"command": "echo $X", "options": {"env": {"X": "hi"}}}),
            ),
        )
        .await;
        assert_eq!(
            reply,
            ServerFrame::Result {
                id: 1,
                value: Value::String("hi".into())
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_with_callback_evaluates_script() {
        let (bridge, mut frames) = connect();
        let reply = dispatch(
            &bridge,
            frame(2, "exec", serde_json::json!({"command": "exit 3", "callback": "cb"})),
        )
        .await;
        assert_eq!(reply, ServerFrame::Result { id: 2, value: Value::Null });

        match frames.recv().await.unwrap() {
            ServerFrame::Eval { script } => assert!(script.contains(r#"cb(3, "", "")"#)),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_spawn_streams_eval_frames() {
        let (bridge, mut frames) = connect();
        dispatch(
            &bridge,
            frame(
                3,
                "spawn",
                serde_json::json!({"command": "echo a", "args": [], "options": "{}", "callback": "p"}),
            ),
        )
        .await;

        let mut scripts = Vec::new();
        while scripts.len() < 2 {
            if let ServerFrame::Eval { script } = frames.recv().await.unwrap() {
                scripts.push(script);
            }
        }
        assert!(scripts[0].contains(r#"p.stdout.emit('data', "a")"#));
        assert!(scripts[1].contains("p.emit('exit', 0)"));
    }

    #[tokio::test]
    async fn test_view_calls_become_frames() {
        let (bridge, mut frames) = connect();
        dispatch(&bridge, frame(4, "toast", serde_json::json!({"message": "hey"}))).await;
        dispatch(&bridge, frame(5, "fullScreen", serde_json::json!({"enable": true}))).await;

        assert_eq!(
            frames.recv().await.unwrap(),
            ServerFrame::Toast {
                message: "hey".into()
            }
        );
        assert_eq!(
            frames.recv().await.unwrap(),
            ServerFrame::FullScreen { enable: true }
        );
    }

    #[tokio::test]
    async fn test_module_info_and_errors() {
        let (bridge, _frames) = connect();
        let reply = dispatch(&bridge, frame(6, "moduleInfo", Value::Null)).await;
        assert_eq!(
            reply,
            ServerFrame::Result {
                id: 6,
                value: Value::String(r#"{"moduleDir":"/data/adb/modules/demo","id":"demo"}"#.into())
            }
        );

        let reply = dispatch(&bridge, frame(7, "reboot", Value::Null)).await;
        assert!(matches!(reply, ServerFrame::Error { id: Some(7), code: 1003, .. }));

        let reply = dispatch(
            &bridge,
            frame(8, "spawn", serde_json::json!({"command": "id", "callback": "bad name"})),
        )
        .await;
        assert!(matches!(reply, ServerFrame::Error { id: Some(8), code: 1002, .. }));
    }

    #[test]
    fn test_server_frame_encoding() {
        let frame = ServerFrame::FullScreen { enable: false };
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"type":"fullScreen","enable":false}"#
        );
        let frame = ServerFrame::Error {
            id: None,
            code: 1003,
            message: "x".into(),
        };
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"type":"error","code":1003,"message":"x"}"#
        );
    }
}
