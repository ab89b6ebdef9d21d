use crate::hub::Broadcaster;
use crate::registry::ConnectionId;
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wordchain_protocol::{Ack, ClientRequest, ErrorKind, ServerMessage};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection_loop(socket, state))
}

/// One participant's connection: intents in, acks and room events out.
async fn connection_loop(socket: WebSocket, state: AppState) {
    let conn: ConnectionId = Uuid::new_v4();
    let (mut sink, mut receiver) = socket.split();
    let (sender, mut outbox) = unbounded_channel::<String>();
    state.hub.connect(conn, sender).await;
    info!(%conn, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                debug!(%conn, "writer stopped: {e}");
                break;
            }
        }
    });

    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                info!(%conn, "connection closed by peer");
                break;
            }
            Ok(Message::Binary(_)) => {
                let ack = Ack::error(None, "Binary frames are not supported", ErrorKind::Validation);
                state.hub.send_to(conn, ServerMessage::Ack(ack)).await;
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(%conn, "unrecoverable socket error: {e}");
                break;
            }
        };
        let ack = dispatch(&state, conn, &text).await;
        state.hub.send_to(conn, ServerMessage::Ack(ack)).await;
    }

    state.session.disconnect(conn).await;
    state.hub.disconnect(conn).await;
    writer.abort();
    info!(%conn, "connection removed");
}

async fn dispatch(state: &AppState, conn: ConnectionId, text: &str) -> Ack {
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            debug!(%conn, "malformed request: {e}");
            return Ack::error(request_id(text), format!("Malformed request: {e}"), ErrorKind::Validation);
        }
    };
    match state.session.handle(conn, request.intent).await {
        Ok(room) => Ack::ok(request.id, room),
        Err(e) => Ack::error(request.id, e.to_string(), e.kind()),
    }
}

/// Best-effort correlation id for frames that fail to parse as a request.
fn request_id(text: &str) -> Option<u64> {
    serde_json::from_str::<Value>(text)
        .ok()?
        .get("id")
        .and_then(Value::as_u64)
}
