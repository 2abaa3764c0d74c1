use crate::relay_service::{RelayConfig, RelayService};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{Message, WebSocket};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use meshroom_core::RelayRequest;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

/// Serves the relay on an already bound listener until it fails.
pub async fn serve(listener: TcpListener, service: RelayService) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Relay listening on ws://{}/ws", addr);
    axum::serve(listener, router(service))
        .await
        .context("Relay server stopped")
}

pub async fn run(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    serve(listener, RelayService::default()).await
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let relay_socket = service.open_socket(tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let relay_socket = relay_socket.clone();

        async move {
            // Requests run one at a time so a client's sends keep their order.
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<RelayRequest>(text.as_str()) {
                            Ok(request) => {
                                let reply = relay_socket.handle(request).await;
                                relay_socket.push(&reply);
                            }
                            Err(e) => warn!(
                                "Invalid relay request on socket {}: {:?}",
                                relay_socket.id(),
                                e
                            ),
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.close_socket(&relay_socket);
}
