//! Launch the Observer server next to the run loop.
//!
//! The engine binary calls [`spawn_observer`] during startup so the HTTP
//! and `WebSocket` API runs concurrently with the tick loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, bind, serve};
use crate::state::AppState;

/// A running Observer server.
#[derive(Debug)]
pub struct ObserverHandle {
    /// Address actually bound, useful when the configured port was `0`.
    pub local_addr: SocketAddr,
    /// The background serving task. Abort it to shut the server down.
    pub task: JoinHandle<()>,
}

/// Bind the Observer server and serve it on a background Tokio task.
///
/// The bind happens before spawning, so an address already in use is
/// reported to the caller instead of only being logged.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the listener cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverHandle, ServerError> {
    let listener = bind(config).await?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%local_addr, "Observer server spawned on background task");
    Ok(ObserverHandle { local_addr, task })
}
