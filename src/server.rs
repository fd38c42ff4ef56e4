//! WebSocket server surface.
//!
//! Two routes: `/asr` upgrades to the audio session protocol, `/health`
//! answers liveness probes. Inbound binary frames are container audio;
//! the only outbound payload is synthesized reply speech, and only when
//! `dialogue.reply = "audio"` — with `reply = "none"` results surface
//! in the server log and nothing goes back over the wire.

use crate::config::ReplyMode;
use crate::dispatch::TranscriptionResult;
use crate::error::{Result, VoxgateError};
use crate::session::{run_session, SessionContext};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

struct ServerState {
    ctx: Arc<SessionContext>,
    next_session: AtomicU64,
}

/// Build the router. Kept separate from [`serve`] so tests can bind it
/// to an ephemeral port.
pub fn app(ctx: Arc<SessionContext>) -> Router {
    let state = Arc::new(ServerState {
        ctx,
        next_session: AtomicU64::new(1),
    });
    Router::new()
        .route("/asr", get(ws_handler))
        .with_state(state)
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({
                    "status": "ok",
                    "version": crate::version_string(),
                }))
            }),
        )
}

/// Bind and run the server until SIGINT or SIGTERM.
pub async fn serve(ctx: Arc<SessionContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);
    let quiet = ctx.quiet;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VoxgateError::Transport {
            message: format!("failed to bind {}: {}", addr, e),
        })?;
    let local = listener.local_addr()?;
    if !quiet {
        eprintln!(
            "voxgate {} listening on ws://{}/asr",
            crate::version_string(),
            local
        );
    }

    axum::serve(listener, app(ctx).into_make_service())
        .with_graceful_shutdown(shutdown_signal(quiet))
        .await
        .map_err(|e| VoxgateError::Transport {
            message: format!("server error: {}", e),
        })?;

    if !quiet {
        eprintln!("Server stopped.");
    }
    Ok(())
}

async fn shutdown_signal(quiet: bool) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!("\nReceived SIGINT, shutting down...");
            }
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                eprintln!("Error setting up signal handler: {}", e);
            }
            if !quiet {
                eprintln!("\nReceived SIGTERM, shutting down...");
            }
        }
    }
}

/// Wait for SIGTERM (used under process supervisors).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| VoxgateError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await
}

async fn ws_handler(
    State(state): State<Arc<ServerState>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| async move {
        let id = state.next_session.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = handle_socket(state, id, socket).await {
            eprintln!("voxgate: session {}: {e}", id);
        }
    })
}

/// Bridge one WebSocket to one session: inbound frames go to the
/// session over a channel, reply audio comes back the other way.
async fn handle_socket(state: Arc<ServerState>, id: u64, socket: WebSocket) -> Result<()> {
    let (mut sender, mut receiver) = socket.split();
    let ctx = Arc::clone(&state.ctx);
    let reply_mode = ctx.config.dialogue.reply;
    let quiet = ctx.quiet;

    let (frame_tx, frame_rx) = mpsc::channel::<Vec<u8>>(64);
    let (result_tx, mut result_rx) = mpsc::channel::<TranscriptionResult>(16);

    // Results must be consumed even when nothing goes on the wire, or
    // the decode loop would stall against a full channel.
    let send_task = tokio::spawn(async move {
        while let Some(result) = result_rx.recv().await {
            if reply_mode != ReplyMode::Audio {
                continue;
            }
            let Some(audio) = result.reply_audio else {
                continue;
            };
            if sender.send(Message::Binary(audio)).await.is_err() {
                break;
            }
        }
    });

    let session = tokio::spawn(run_session(ctx, id, frame_rx, result_tx));

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Binary(data) => {
                if frame_tx.send(data).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Text(text) => {
                if !quiet {
                    eprintln!("session {}: ignoring unexpected text frame: {}", id, text);
                }
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Closing the frame channel is the session's end-of-input signal;
    // it drains, reaps its decoder, and drops the result sender, which
    // in turn ends the send task.
    drop(frame_tx);
    let outcome = match session.await {
        Ok(outcome) => outcome,
        Err(e) => Err(VoxgateError::Other(format!("session task failed: {}", e))),
    };
    send_task.await.unwrap_or(());
    outcome
}
