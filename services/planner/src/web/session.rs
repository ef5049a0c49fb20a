//! services/planner/src/web/session.rs
//!
//! One form session per WebSocket connection. The session task owns the form
//! and applies client commands one at a time; alerts and confirmations are
//! sent out through the `PromptBridge` and answered by the socket reader.

use crate::web::protocol::{ClientMessage, FormView, ServerMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use trip_planner_core::domain::{Notice, TripId};
use trip_planner_core::form::{FormError, StepFormController};
use trip_planner_core::orchestrator::{
    OrchestratorError, ResumeOutcome, SubmitOutcome, TripOrchestrator,
};
use trip_planner_core::ports::{Navigator, Notifier};

//=========================================================================================
// PromptBridge (Notifier and Navigator over the socket)
//=========================================================================================

/// Sends prompts to the client and waits for the matching `PromptReply`.
pub struct PromptBridge {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<bool>>>,
    closed: AtomicBool,
}

impl PromptBridge {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            outbound,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues a message for the client. Returns `false` once the client is gone.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbound.send(message).is_ok()
    }

    /// Routes a client reply to the prompt waiting for it.
    pub fn resolve(&self, prompt_id: u64, accepted: bool) -> bool {
        let waiter = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&prompt_id));
        match waiter {
            Some(waiter) => waiter.send(accepted).is_ok(),
            None => false,
        }
    }

    /// Drops every waiting prompt; they resolve as dismissed / declined, and
    /// so does any prompt raised afterwards.
    pub fn cancel_all(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            self.closed.store(true, Ordering::SeqCst);
            pending.clear();
        }
    }

    async fn ask(&self, build: impl FnOnce(u64) -> ServerMessage) -> Option<bool> {
        let prompt_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        match self.pending.lock() {
            Ok(mut pending) if !self.closed.load(Ordering::SeqCst) => {
                pending.insert(prompt_id, tx);
            }
            _ => return None,
        }

        if !self.send(build(prompt_id)) {
            if let Ok(mut pending) = self.pending.lock() {
                pending.remove(&prompt_id);
            }
            return None;
        }
        rx.await.ok()
    }
}

#[async_trait]
impl Notifier for PromptBridge {
    async fn alert(&self, notice: &Notice) {
        if self.ask(|id| ServerMessage::alert(id, notice)).await.is_none() {
            debug!("Alert '{}' dropped, client gone", notice.title);
        }
    }

    async fn confirm(&self, notice: &Notice) -> bool {
        self.ask(|id| ServerMessage::confirm(id, notice))
            .await
            .unwrap_or(false)
    }
}

#[async_trait]
impl Navigator for PromptBridge {
    async fn open_trip(&self, trip_id: &TripId) {
        self.send(ServerMessage::Navigate {
            trip_id: trip_id.to_string(),
        });
    }
}

//=========================================================================================
// Command Routing
//=========================================================================================

/// Commands queued while the session is busy (e.g. waiting on the trip API).
pub const COMMAND_BUFFER: usize = 32;

/// Hands one client message to the session. Prompt replies go straight to
/// the waiting prompt; a full command queue is answered with an error
/// instead of waiting, so replies keep flowing. Returns `false` once the
/// session is gone.
pub fn route_client_message(
    bridge: &PromptBridge,
    commands: &mpsc::Sender<ClientMessage>,
    message: ClientMessage,
) -> bool {
    let command = match message {
        ClientMessage::PromptReply {
            prompt_id,
            accepted,
        } => {
            if !bridge.resolve(prompt_id, accepted) {
                warn!("No open prompt with id {}", prompt_id);
            }
            return true;
        }
        command => command,
    };

    match commands.try_send(command) {
        Ok(()) => true,
        Err(TrySendError::Full(command)) => {
            warn!(?command, "Command queue full, dropping command");
            bridge.send(ServerMessage::Error {
                message: "Too many pending commands, try again shortly".to_string(),
            });
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

//=========================================================================================
// The Session Loop
//=========================================================================================

/// Resumes a stored trip if there is one; otherwise runs `form` until the
/// command channel closes or a trip is created.
pub async fn run_session(
    orchestrator: TripOrchestrator,
    mut form: StepFormController,
    bridge: &PromptBridge,
    mut commands: mpsc::Receiver<ClientMessage>,
) {
    if let ResumeOutcome::Resume(trip_id) = orchestrator.resume_if_exists().await {
        info!("Session resumed trip {}", trip_id);
        return;
    }

    if !bridge.send(ServerMessage::FormReady {
        form: FormView::from(&form),
    }) {
        return;
    }

    while let Some(command) = commands.recv().await {
        if let Some(trip_id) = apply_command(&orchestrator, bridge, &mut form, command).await {
            // The client has been sent to the new trip; the form is done.
            info!("Form session finished with trip {}", trip_id);
            return;
        }
        if !bridge.send(ServerMessage::FormState {
            form: FormView::from(&form),
        }) {
            break;
        }
    }
    info!("Form session ended.");
}

/// Applies one command. Returns the trip id once a trip was created.
async fn apply_command(
    orchestrator: &TripOrchestrator,
    bridge: &PromptBridge,
    form: &mut StepFormController,
    command: ClientMessage,
) -> Option<TripId> {
    let result = match command {
        ClientMessage::SetDestination { destination } => form.set_destination(&destination),
        ClientMessage::OpenCalendar => form.open_calendar(),
        ClientMessage::OpenGuests => form.open_guests(),
        ClientMessage::CloseOverlay => {
            form.close_overlay();
            Ok(())
        }
        ClientMessage::SelectDay { date } => form.select_day(date, orchestrator.today()),
        ClientMessage::AddGuest { email } => form.add_guest(&email),
        ClientMessage::RemoveGuest { email } => form.remove_guest(&email).map(|_| ()),
        ClientMessage::StepBack => form.request_step_back(),
        ClientMessage::Advance => return submit(orchestrator, bridge, form).await,
        ClientMessage::PromptReply { prompt_id, .. } => {
            warn!("Prompt reply {} arrived with no prompt open", prompt_id);
            Ok(())
        }
    };

    if let Err(e) = result {
        report_form_error(bridge, e).await;
    }
    None
}

async fn submit(
    orchestrator: &TripOrchestrator,
    bridge: &PromptBridge,
    form: &mut StepFormController,
) -> Option<TripId> {
    let outcome = orchestrator
        .submit_reporting(form, |form| {
            bridge.send(ServerMessage::FormState {
                form: FormView::from(form),
            });
        })
        .await;

    match outcome {
        Ok(SubmitOutcome::Created(trip_id)) => {
            info!("Trip {} created", trip_id);
            return Some(trip_id);
        }
        Ok(outcome) => debug!(?outcome, "Primary action handled"),
        // The user has already been told; the form stays on the guests step.
        Err(OrchestratorError::CreateFailed(e)) => warn!("Trip creation failed: {}", e),
        Err(e @ OrchestratorError::PersistenceFailed { .. }) => {
            error!("Trip will not be resumed on this device: {}", e)
        }
    }
    None
}

async fn report_form_error(bridge: &PromptBridge, e: FormError) {
    match e.notice() {
        Some(notice) => bridge.alert(&notice).await,
        None => {
            warn!("Rejected form command: {}", e);
            bridge.send(ServerMessage::Error {
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};
    use std::sync::Arc;
    use trip_planner_core::domain::{NewTrip, Trip};
    use trip_planner_core::ports::{PortError, PortResult, TripService, TripStorage};

    #[derive(Default)]
    struct StubTrips {
        created: Mutex<Vec<NewTrip>>,
    }

    #[async_trait]
    impl TripService for StubTrips {
        async fn create_trip(&self, trip: &NewTrip) -> PortResult<TripId> {
            self.created.lock().unwrap().push(trip.clone());
            Ok(TripId::new("trip-42"))
        }

        async fn get_trip_by_id(&self, trip_id: &TripId) -> PortResult<Trip> {
            Err(PortError::NotFound(trip_id.to_string()))
        }
    }

    #[derive(Default)]
    struct StubStorage {
        slot: Mutex<Option<TripId>>,
    }

    #[async_trait]
    impl TripStorage for StubStorage {
        async fn get(&self) -> PortResult<Option<TripId>> {
            Ok(self.slot.lock().unwrap().clone())
        }

        async fn save(&self, trip_id: &TripId) -> PortResult<()> {
            *self.slot.lock().unwrap() = Some(trip_id.clone());
            Ok(())
        }
    }

    struct Client {
        commands: mpsc::Sender<ClientMessage>,
        inbox: mpsc::UnboundedReceiver<ServerMessage>,
        bridge: Arc<PromptBridge>,
    }

    impl Client {
        async fn send(&self, command: ClientMessage) {
            assert!(
                route_client_message(&self.bridge, &self.commands, command),
                "session alive"
            );
        }

        async fn next(&mut self) -> ServerMessage {
            self.inbox.recv().await.expect("server message")
        }

        async fn next_form(&mut self) -> FormView {
            match self.next().await {
                ServerMessage::FormState { form } | ServerMessage::FormReady { form } => form,
                other => panic!("expected form state, got {other:?}"),
            }
        }

        /// Answers the next prompt and returns it.
        async fn answer(&mut self, accepted: bool) -> ServerMessage {
            let message = self.next().await;
            let prompt_id = match &message {
                ServerMessage::Alert { prompt_id, .. } | ServerMessage::Confirm { prompt_id, .. } => {
                    *prompt_id
                }
                other => panic!("expected prompt, got {other:?}"),
            };
            assert!(self.bridge.resolve(prompt_id, accepted));
            message
        }
    }

    fn start(trips: Arc<StubTrips>, storage: Arc<StubStorage>) -> Client {
        let (out_tx, inbox) = mpsc::unbounded_channel();
        let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let bridge = Arc::new(PromptBridge::new(out_tx));
        let orchestrator = TripOrchestrator::new(
            trips,
            storage,
            bridge.clone(),
            bridge.clone(),
            FixedOffset::east_opt(0).unwrap(),
        );
        let session_bridge = bridge.clone();
        tokio::spawn(async move {
            run_session(
                orchestrator,
                StepFormController::new(),
                &session_bridge,
                commands_rx,
            )
            .await;
        });
        Client {
            commands,
            inbox,
            bridge,
        }
    }

    fn future_day(days: i64) -> NaiveDate {
        Utc::now().date_naive() + chrono::Duration::days(days)
    }

    #[tokio::test]
    async fn drives_form_to_created_trip() {
        let trips = Arc::new(StubTrips::default());
        let storage = Arc::new(StubStorage::default());
        let mut client = start(trips.clone(), storage.clone());

        let ready = client.next_form().await;
        assert_eq!(ready.step, "details");

        client
            .send(ClientMessage::SetDestination {
                destination: "Florianopolis".into(),
            })
            .await;
        client.next_form().await;
        client.send(ClientMessage::OpenCalendar).await;
        assert_eq!(client.next_form().await.overlay, "calendar");
        client.send(ClientMessage::SelectDay { date: future_day(10) }).await;
        client.next_form().await;
        client.send(ClientMessage::SelectDay { date: future_day(16) }).await;
        assert_eq!(client.next_form().await.marked_dates.len(), 7);
        client.send(ClientMessage::CloseOverlay).await;
        client.next_form().await;

        client.send(ClientMessage::Advance).await;
        let form = client.next_form().await;
        assert_eq!(form.step, "guests");
        assert!(!form.destination_editable);

        client.send(ClientMessage::Advance).await;
        assert!(matches!(client.answer(true).await, ServerMessage::Confirm { .. }));
        let submitting = client.next_form().await;
        assert!(submitting.submitting);
        assert_eq!(submitting.step, "guests");
        assert!(matches!(client.answer(true).await, ServerMessage::Alert { .. }));
        assert_eq!(
            client.next().await,
            ServerMessage::Navigate {
                trip_id: "trip-42".into()
            }
        );

        assert_eq!(trips.created.lock().unwrap().len(), 1);
        assert_eq!(*storage.slot.lock().unwrap(), Some(TripId::new("trip-42")));

        // The form is finished; a second tap cannot create another trip.
        client.commands.closed().await;
        assert!(!route_client_message(
            &client.bridge,
            &client.commands,
            ClientMessage::Advance
        ));
        assert!(client.inbox.try_recv().is_err());
        assert_eq!(trips.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prompt_reply_gets_through_a_full_command_queue() {
        let trips = Arc::new(StubTrips::default());
        let mut client = start(trips.clone(), Arc::default());
        client.next_form().await;
        client
            .send(ClientMessage::SetDestination {
                destination: "Florianopolis".into(),
            })
            .await;
        client.next_form().await;
        client.send(ClientMessage::OpenCalendar).await;
        client.next_form().await;
        client.send(ClientMessage::SelectDay { date: future_day(3) }).await;
        client.next_form().await;
        client.send(ClientMessage::SelectDay { date: future_day(5) }).await;
        client.next_form().await;
        client.send(ClientMessage::CloseOverlay).await;
        client.next_form().await;
        client.send(ClientMessage::Advance).await;
        client.next_form().await;

        // The session now waits on the confirmation prompt.
        client.send(ClientMessage::Advance).await;
        let prompt_id = match client.next().await {
            ServerMessage::Confirm { prompt_id, .. } => prompt_id,
            other => panic!("expected confirm, got {other:?}"),
        };

        let overflow = 8;
        for _ in 0..COMMAND_BUFFER + overflow {
            client.send(ClientMessage::StepBack).await;
        }
        for _ in 0..overflow {
            assert!(matches!(client.next().await, ServerMessage::Error { .. }));
        }

        client
            .send(ClientMessage::PromptReply {
                prompt_id,
                accepted: false,
            })
            .await;

        let declined = client.next_form().await;
        assert_eq!(declined.step, "guests");
        assert!(!declined.submitting);

        // The first queued step back applies; the rest find the details step.
        assert_eq!(client.next_form().await.step, "details");
        for _ in 1..COMMAND_BUFFER {
            assert!(matches!(client.next().await, ServerMessage::Error { .. }));
            client.next_form().await;
        }
        assert!(trips.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn guest_errors_become_alerts() {
        let mut client = start(Arc::default(), Arc::default());
        client.next_form().await;

        client.send(ClientMessage::OpenGuests).await;
        assert!(matches!(client.next().await, ServerMessage::Error { .. }));
        assert_eq!(client.next_form().await.overlay, "none");

        client
            .send(ClientMessage::SetDestination {
                destination: "Florianopolis".into(),
            })
            .await;
        client.next_form().await;
        client.send(ClientMessage::OpenCalendar).await;
        client.next_form().await;
        client.send(ClientMessage::SelectDay { date: future_day(1) }).await;
        client.next_form().await;
        client.send(ClientMessage::SelectDay { date: future_day(1) }).await;
        assert_eq!(client.next_form().await.marked_dates.len(), 1);
        client.send(ClientMessage::CloseOverlay).await;
        client.next_form().await;
        client.send(ClientMessage::Advance).await;
        client.next_form().await;
        client.send(ClientMessage::OpenGuests).await;
        assert_eq!(client.next_form().await.overlay, "guests");

        client.send(ClientMessage::AddGuest { email: "x".into() }).await;
        match client.answer(true).await {
            ServerMessage::Alert { message, .. } => assert_eq!(message, "Invalid e-mail."),
            other => panic!("unexpected {other:?}"),
        }
        assert!(client.next_form().await.guests.is_empty());

        client
            .send(ClientMessage::AddGuest {
                email: "x@y.com".into(),
            })
            .await;
        assert_eq!(client.next_form().await.guest_badge, "1 guest(s)");
    }

    #[tokio::test]
    async fn past_day_is_reported_as_error() {
        let mut client = start(Arc::default(), Arc::default());
        client.next_form().await;
        client.send(ClientMessage::OpenCalendar).await;
        client.next_form().await;

        client.send(ClientMessage::SelectDay { date: future_day(-2) }).await;

        assert!(matches!(client.next().await, ServerMessage::Error { .. }));
        assert_eq!(client.next_form().await.starts_at, None);
    }

    #[tokio::test]
    async fn stored_but_missing_trip_shows_the_form() {
        let storage = Arc::new(StubStorage {
            slot: Mutex::new(Some(TripId::new("trip-123"))),
        });
        let mut client = start(Arc::default(), storage);

        assert!(matches!(client.next().await, ServerMessage::FormReady { .. }));
    }

    #[tokio::test]
    async fn confirm_resolves_false_when_client_leaves() {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let bridge = PromptBridge::new(out_tx);
        drop(out_rx);

        assert!(!bridge.confirm(&Notice::confirm_trip()).await);
    }

    #[tokio::test]
    async fn cancel_all_releases_waiting_prompts() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let bridge = Arc::new(PromptBridge::new(out_tx));

        let waiting = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.confirm(&Notice::confirm_trip()).await })
        };
        assert!(matches!(out_rx.recv().await, Some(ServerMessage::Confirm { .. })));
        bridge.cancel_all();

        assert!(!waiting.await.expect("join"));
        assert!(!bridge.resolve(1, true));

        // Prompts raised after the client left do not wait for an answer.
        assert!(!bridge.confirm(&Notice::confirm_trip()).await);
        assert!(out_rx.try_recv().is_err());
    }
}
