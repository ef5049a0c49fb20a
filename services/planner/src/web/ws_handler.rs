//! services/planner/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! The socket is split into a writer task, a form session task, and the reader
//! loop below, which routes prompt replies straight to the waiting prompt and
//! queues every other command for the session.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    session::{route_client_message, run_session, PromptBridge, COMMAND_BUFFER},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Instrument};
use trip_planner_core::form::StepFormController;
use trip_planner_core::orchestrator::TripOrchestrator;
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| {
        let connection_id = Uuid::new_v4();
        handle_socket(socket, app_state)
            .instrument(tracing::info_span!("form_session", %connection_id))
    })
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established");

    let (mut ws_sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (commands_tx, commands_rx) = mpsc::channel::<ClientMessage>(COMMAND_BUFFER);
    let bridge = Arc::new(PromptBridge::new(outbound_tx));

    // --- 1. Writer Task ---
    let writer = tokio::spawn(
        async move {
            while let Some(message) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize server message: {:?}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    warn!("Failed to send message, client gone.");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    // --- 2. Form Session Task ---
    let orchestrator = TripOrchestrator::new(
        app_state.trips.clone(),
        app_state.storage.clone(),
        bridge.clone(),
        bridge.clone(),
        app_state.config.utc_offset,
    );
    let form = StepFormController::with_booking_horizon(app_state.config.booking_horizon_days);
    let session = {
        let bridge = bridge.clone();
        tokio::spawn(
            async move { run_session(orchestrator, form, &bridge, commands_rx).await }
                .in_current_span(),
        )
    };

    // --- 3. Reader Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    if !route_client_message(&bridge, &commands_tx, message) {
                        info!("Form session finished, closing connection.");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse client message: {:?}", e);
                    bridge.send(ServerMessage::Error {
                        message: format!("Invalid message: {}", e),
                    });
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 4. Cleanup ---
    // A running trip creation is left to finish; pending prompts resolve as
    // dismissed so it does not wait on a client that is gone.
    drop(commands_tx);
    bridge.cancel_all();
    if let Err(e) = session.await {
        error!("Form session task failed: {:?}", e);
    }
    // The writer ends once the last bridge handle is gone.
    drop(bridge);
    if let Err(e) = writer.await {
        error!("Writer task failed: {:?}", e);
    }
    info!("WebSocket connection closed.");
}
