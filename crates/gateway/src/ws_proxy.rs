use std::sync::Arc;

use axum::extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as TungMessage;
use tracing::{info, warn};

use crate::app::AppState;

/// GET /ws/teaching — reverse-proxies the teaching channel to conversation.
///
/// The gateway never parses these frames; it splices the client socket to
/// an upstream connection to conversation so business logic (scene
/// pacing, ack handling) stays in one place.
pub async fn ws_proxy_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let auth = headers.get(axum::http::header::AUTHORIZATION).cloned();
    ws.on_upgrade(move |socket| proxy_connection(socket, state, auth))
}

async fn proxy_connection(client_socket: WebSocket, state: Arc<AppState>, auth: Option<HeaderValue>) {
    let upstream_url = format!("{}/ws/teaching", state.config.conversation_url.replacen("http", "ws", 1));

    let mut request = match upstream_url.as_str().into_client_request() {
        Ok(req) => req,
        Err(e) => {
            warn!("invalid conversation ws url {upstream_url}: {e}");
            return;
        }
    };
    if let Some(auth) = auth {
        request.headers_mut().insert(axum::http::header::AUTHORIZATION, auth);
    }

    let upstream = match tokio_tungstenite::connect_async(request).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("failed to connect to conversation teaching channel: {e}");
            return;
        }
    };

    let (mut client_tx, mut client_rx) = client_socket.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    loop {
        tokio::select! {
            msg = client_rx.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        if let Some(forwarded) = to_tungstenite(msg) {
                            if upstream_tx.send(forwarded).await.is_err() {
                                break;
                            }
                        }
                    }
                    _ => break,
                }
            }
            msg = upstream_rx.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        if let Some(forwarded) = to_axum(msg) {
                            if client_tx.send(forwarded).await.is_err() {
                                break;
                            }
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    info!("teaching channel proxy connection closed");
}

fn to_tungstenite(msg: AxumMessage) -> Option<TungMessage> {
    match msg {
        AxumMessage::Text(t) => Some(TungMessage::Text(t.to_string().into())),
        AxumMessage::Binary(b) => Some(TungMessage::Binary(b)),
        AxumMessage::Ping(b) => Some(TungMessage::Ping(b)),
        AxumMessage::Pong(b) => Some(TungMessage::Pong(b)),
        AxumMessage::Close(_) => None,
    }
}

fn to_axum(msg: TungMessage) -> Option<AxumMessage> {
    match msg {
        TungMessage::Text(t) => Some(AxumMessage::Text(t.to_string().into())),
        TungMessage::Binary(b) => Some(AxumMessage::Binary(b)),
        TungMessage::Ping(b) => Some(AxumMessage::Ping(b)),
        TungMessage::Pong(b) => Some(AxumMessage::Pong(b)),
        TungMessage::Close(_) | TungMessage::Frame(_) => None,
    }
}
