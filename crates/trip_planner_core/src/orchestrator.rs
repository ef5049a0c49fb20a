//! crates/trip_planner_core/src/orchestrator.rs
//!
//! Ties the form to the outside world: resumes a previously created trip at
//! startup, and turns a confirmed draft into a remote trip whose id is kept
//! locally.

use crate::domain::{NewTrip, Notice, TripDraft, TripId};
use crate::form::{Advance, StepFormController, ValidationError};
use crate::ports::{Navigator, Notifier, PortError, TripService, TripStorage};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

//=========================================================================================
// Errors and Outcomes
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The remote service did not create the trip. Nothing was stored.
    #[error("Trip creation failed: {0}")]
    CreateFailed(#[source] PortError),

    /// The trip exists remotely but its id could not be stored locally,
    /// so it will not be resumed on the next start.
    #[error("Trip {trip_id} was created but could not be saved locally: {source}")]
    PersistenceFailed {
        trip_id: TripId,
        #[source]
        source: PortError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// An existing trip was found and the user was sent to it.
    Resume(TripId),
    /// Nothing to resume; show the creation form.
    StartFresh,
}

/// The result of pressing the primary action through the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(ValidationError),
    MovedToGuests,
    Declined,
    Busy,
    Created(TripId),
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

#[derive(Clone)]
pub struct TripOrchestrator {
    trips: Arc<dyn TripService>,
    storage: Arc<dyn TripStorage>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    utc_offset: FixedOffset,
}

impl TripOrchestrator {
    /// `utc_offset` is the user's timezone; trip days start at local midnight.
    pub fn new(
        trips: Arc<dyn TripService>,
        storage: Arc<dyn TripStorage>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            trips,
            storage,
            notifier,
            navigator,
            utc_offset,
        }
    }

    /// The calendar day it currently is for the user.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    /// Looks for a trip created in an earlier session. Any failure along the
    /// way degrades to `StartFresh`.
    pub async fn resume_if_exists(&self) -> ResumeOutcome {
        let trip_id = match self.storage.get().await {
            Ok(Some(trip_id)) => trip_id,
            Ok(None) => {
                info!("No stored trip, starting fresh");
                return ResumeOutcome::StartFresh;
            }
            Err(e) => {
                warn!("Failed to read the stored trip reference: {:?}", e);
                return ResumeOutcome::StartFresh;
            }
        };

        match self.trips.get_trip_by_id(&trip_id).await {
            Ok(trip) => {
                info!("Resuming trip {}", trip.id);
                self.navigator.open_trip(&trip.id).await;
                ResumeOutcome::Resume(trip.id)
            }
            Err(e) => {
                error!("Failed to fetch stored trip {}: {:?}", trip_id, e);
                ResumeOutcome::StartFresh
            }
        }
    }

    /// Remote create, user acknowledgment, local save, navigation. Each step
    /// only runs when the previous one succeeded.
    pub async fn create_trip(&self, draft: &TripDraft) -> Result<TripId, OrchestratorError> {
        let new_trip = self.to_new_trip(draft);
        info!(
            destination = %new_trip.destination,
            starts_at = %new_trip.starts_at,
            ends_at = %new_trip.ends_at,
            guests = new_trip.emails_to_invite.len(),
            "Creating trip"
        );

        let trip_id = match self.trips.create_trip(&new_trip).await {
            Ok(trip_id) => trip_id,
            Err(e) => {
                error!("Failed to create trip: {:?}", e);
                self.notifier.alert(&Notice::trip_creation_failed()).await;
                return Err(OrchestratorError::CreateFailed(e));
            }
        };

        self.notifier.alert(&Notice::trip_created()).await;

        if let Err(e) = self.storage.save(&trip_id).await {
            error!("Trip {} created but not saved locally: {:?}", trip_id, e);
            self.notifier.alert(&Notice::trip_not_saved()).await;
            return Err(OrchestratorError::PersistenceFailed { trip_id, source: e });
        }

        self.navigator.open_trip(&trip_id).await;
        Ok(trip_id)
    }

    /// Presses the form's primary action and, once the user confirms,
    /// creates the trip. The form is back to idle when this returns.
    pub async fn submit(
        &self,
        form: &mut StepFormController,
    ) -> Result<SubmitOutcome, OrchestratorError> {
        self.submit_reporting(form, |_| {}).await
    }

    /// Like `submit`, and hands the form to `on_submitting` once it is in
    /// the submitting phase, before the remote create starts.
    pub async fn submit_reporting<F>(
        &self,
        form: &mut StepFormController,
        on_submitting: F,
    ) -> Result<SubmitOutcome, OrchestratorError>
    where
        F: FnOnce(&StepFormController) + Send,
    {
        let draft = match form.request_advance(self.notifier.as_ref()).await {
            Advance::Rejected(reason) => return Ok(SubmitOutcome::Rejected(reason)),
            Advance::MovedToGuests => return Ok(SubmitOutcome::MovedToGuests),
            Advance::Declined => return Ok(SubmitOutcome::Declined),
            Advance::Busy => return Ok(SubmitOutcome::Busy),
            Advance::Confirmed(draft) => draft,
        };

        form.begin_submission();
        on_submitting(&*form);
        let result = self.create_trip(&draft).await;
        form.finish_submission();

        result.map(SubmitOutcome::Created)
    }

    pub fn to_new_trip(&self, draft: &TripDraft) -> NewTrip {
        NewTrip {
            destination: draft.destination.clone(),
            starts_at: wire_timestamp(draft.starts_at, self.utc_offset),
            ends_at: wire_timestamp(draft.ends_at, self.utc_offset),
            emails_to_invite: draft.emails_to_invite.clone(),
        }
    }
}

/// Local midnight of `day` in `offset`, as an RFC 3339 UTC timestamp.
pub fn wire_timestamp(day: NaiveDate, offset: FixedOffset) -> String {
    let local_midnight = day.and_time(NaiveTime::MIN);
    let utc = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
}
