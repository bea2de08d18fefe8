//! WebUI host
//!
//! Serves installed modules' web UIs over HTTP and exposes the command
//! bridge to each page over a WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use webui_bridge::{LocalModuleFs, ModuleService, ShellLauncher, ShellProvider, SuShellProvider};

mod api;
mod config;
mod error;

pub use config::Config;
pub use error::Result;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub shells: Arc<dyn ShellProvider>,
    pub modules: Arc<ModuleService>,
}

impl AppState {
    pub fn new(config: Arc<Config>, shells: Arc<dyn ShellProvider>) -> Self {
        let modules = Arc::new(ModuleService::new(
            Arc::new(LocalModuleFs),
            &config.modules_dir,
            config.show_disabled,
        ));
        Self {
            config,
            shells,
            modules,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::load()?);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let http_addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;

    info!("Starting WebUI host");
    info!("HTTP listening on {}", http_addr);
    info!(
        "Modules from {}, elevated shell via {} (mount master: {})",
        config.modules_dir, config.su_path, config.mount_master
    );

    let shells: Arc<dyn ShellProvider> = Arc::new(SuShellProvider::new(ShellLauncher::new(
        &config.su_path,
        config.mount_master,
    )));
    let state = AppState::new(config.clone(), shells);

    let app = api::http::create_router(state);

    axum::serve(
        tokio::net::TcpListener::bind(http_addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Host shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
